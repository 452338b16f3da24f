use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};
use tracing::warn;

use crate::model::SectionRecord;

use super::{StoreResult, count_rows, json_list, list_column};

pub fn exists_by_parent(connection: &Connection, paper_id: i64) -> StoreResult<bool> {
    Ok(count_by_parent(connection, paper_id)? > 0)
}

pub fn count_by_parent(connection: &Connection, paper_id: i64) -> StoreResult<usize> {
    count_rows(
        connection,
        "SELECT COUNT(*) FROM text_sections WHERE paper_id = ?1",
        paper_id,
    )
}

pub fn find_by_parent(connection: &Connection, paper_id: i64) -> StoreResult<Vec<SectionRecord>> {
    let mut statement = connection.prepare(
        "
        SELECT id, paper_id, title, content, summary, keywords,
               section_number, level, word_count, extracted_at
        FROM text_sections
        WHERE paper_id = ?1
        ORDER BY section_number
        ",
    )?;
    let rows = statement.query_map([paper_id], map_section_row)?;

    let mut sections = Vec::new();
    for row in rows {
        sections.push(row?);
    }
    Ok(sections)
}

/// Insert with idempotent re-save: the same section id maps to an update.
/// A clash on (paper_id, section_number) with a different id still fails
/// as a conflict.
pub fn save(connection: &Connection, section: &SectionRecord) -> StoreResult<()> {
    connection.execute(
        "
        INSERT INTO text_sections (
          id, paper_id, title, content, summary, keywords,
          section_number, level, word_count, extracted_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT(id) DO UPDATE SET
          paper_id = excluded.paper_id,
          title = excluded.title,
          content = excluded.content,
          summary = excluded.summary,
          keywords = excluded.keywords,
          section_number = excluded.section_number,
          level = excluded.level,
          word_count = excluded.word_count,
          extracted_at = excluded.extracted_at
        ",
        params![
            section.id,
            section.paper_id,
            section.title,
            section.content,
            section.summary,
            json_list(&section.keywords)?,
            section.section_number,
            section.level,
            section.word_count,
            section.extracted_at,
        ],
    )?;
    Ok(())
}

/// Saves the whole batch; all rows must succeed for the call to succeed.
pub fn save_all(connection: &Connection, sections: &[SectionRecord]) -> StoreResult<usize> {
    let mut saved = 0;
    for section in sections {
        if let Err(err) = save(connection, section) {
            warn!(
                saved,
                total = sections.len(),
                section = section.section_number,
                "section batch aborted"
            );
            return Err(err);
        }
        saved += 1;
    }
    Ok(saved)
}

pub fn delete_by_parent(connection: &Connection, paper_id: i64) -> StoreResult<usize> {
    let deleted = connection.execute("DELETE FROM text_sections WHERE paper_id = ?1", [paper_id])?;
    Ok(deleted)
}

fn map_section_row(row: &Row<'_>) -> rusqlite::Result<SectionRecord> {
    let extracted_at: DateTime<Utc> = row.get(9)?;

    Ok(SectionRecord {
        id: row.get(0)?,
        paper_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        summary: row.get(4)?,
        keywords: list_column(row, 5)?,
        section_number: row.get(6)?,
        level: row.get(7)?,
        word_count: row.get(8)?,
        extracted_at,
    })
}
