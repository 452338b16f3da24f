use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};
use tracing::warn;

use crate::model::TableRecord;

use super::{StoreResult, count_rows, json_list, list_column};

pub fn exists_by_parent(connection: &Connection, paper_id: i64) -> StoreResult<bool> {
    Ok(count_by_parent(connection, paper_id)? > 0)
}

pub fn count_by_parent(connection: &Connection, paper_id: i64) -> StoreResult<usize> {
    count_rows(
        connection,
        "SELECT COUNT(*) FROM table_data WHERE paper_id = ?1",
        paper_id,
    )
}

pub fn find_by_parent(connection: &Connection, paper_id: i64) -> StoreResult<Vec<TableRecord>> {
    let mut statement = connection.prepare(
        "
        SELECT id, paper_id, table_number, title, raw_content, summary,
               context_analysis, statistical_findings, keywords,
               column_count, row_count, extracted_at
        FROM table_data
        WHERE paper_id = ?1
        ORDER BY table_number
        ",
    )?;
    let rows = statement.query_map([paper_id], map_table_row)?;

    let mut tables = Vec::new();
    for row in rows {
        tables.push(row?);
    }
    Ok(tables)
}

pub fn save(connection: &Connection, table: &TableRecord) -> StoreResult<()> {
    connection.execute(
        "
        INSERT INTO table_data (
          id, paper_id, table_number, title, raw_content, summary,
          context_analysis, statistical_findings, keywords,
          column_count, row_count, extracted_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        ON CONFLICT(id) DO UPDATE SET
          paper_id = excluded.paper_id,
          table_number = excluded.table_number,
          title = excluded.title,
          raw_content = excluded.raw_content,
          summary = excluded.summary,
          context_analysis = excluded.context_analysis,
          statistical_findings = excluded.statistical_findings,
          keywords = excluded.keywords,
          column_count = excluded.column_count,
          row_count = excluded.row_count,
          extracted_at = excluded.extracted_at
        ",
        params![
            table.id,
            table.paper_id,
            table.table_number,
            table.title,
            table.raw_content,
            table.summary,
            table.context_analysis,
            table.statistical_findings,
            json_list(&table.keywords)?,
            table.column_count,
            table.row_count,
            table.extracted_at,
        ],
    )?;
    Ok(())
}

pub fn save_all(connection: &Connection, tables: &[TableRecord]) -> StoreResult<usize> {
    let mut saved = 0;
    for table in tables {
        if let Err(err) = save(connection, table) {
            warn!(
                saved,
                total = tables.len(),
                table = table.table_number,
                "table batch aborted"
            );
            return Err(err);
        }
        saved += 1;
    }
    Ok(saved)
}

pub fn delete_by_parent(connection: &Connection, paper_id: i64) -> StoreResult<usize> {
    let deleted = connection.execute("DELETE FROM table_data WHERE paper_id = ?1", [paper_id])?;
    Ok(deleted)
}

fn map_table_row(row: &Row<'_>) -> rusqlite::Result<TableRecord> {
    let extracted_at: DateTime<Utc> = row.get(11)?;

    Ok(TableRecord {
        id: row.get(0)?,
        paper_id: row.get(1)?,
        table_number: row.get(2)?,
        title: row.get(3)?,
        raw_content: row.get(4)?,
        summary: row.get(5)?,
        context_analysis: row.get(6)?,
        statistical_findings: row.get(7)?,
        keywords: list_column(row, 8)?,
        column_count: row.get(9)?,
        row_count: row.get(10)?,
        extracted_at,
    })
}
