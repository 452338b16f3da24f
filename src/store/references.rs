use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::model::ReferenceList;

use super::{StoreResult, count_rows, json_list, list_column};

pub fn exists_by_parent(connection: &Connection, paper_id: i64) -> StoreResult<bool> {
    Ok(count_by_parent(connection, paper_id)? > 0)
}

pub fn count_by_parent(connection: &Connection, paper_id: i64) -> StoreResult<usize> {
    count_rows(
        connection,
        "SELECT COUNT(*) FROM reference_lists WHERE paper_id = ?1",
        paper_id,
    )
}

pub fn find_by_parent(connection: &Connection, paper_id: i64) -> StoreResult<Option<ReferenceList>> {
    let list = connection
        .query_row(
            "
            SELECT id, paper_id, entries, reference_count, extracted_at
            FROM reference_lists
            WHERE paper_id = ?1
            ",
            [paper_id],
            map_reference_row,
        )
        .optional()?;
    Ok(list)
}

/// Plain insert: one list per paper, and the caller deletes a stored list
/// before replacing it. An unexpected clash surfaces as a conflict.
pub fn save(connection: &Connection, list: &ReferenceList) -> StoreResult<()> {
    connection.execute(
        "
        INSERT INTO reference_lists (id, paper_id, entries, reference_count, extracted_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ",
        params![
            list.id,
            list.paper_id,
            json_list(&list.references)?,
            list.reference_count,
            list.extracted_at,
        ],
    )?;
    Ok(())
}

pub fn delete_by_parent(connection: &Connection, paper_id: i64) -> StoreResult<usize> {
    let deleted =
        connection.execute("DELETE FROM reference_lists WHERE paper_id = ?1", [paper_id])?;
    Ok(deleted)
}

fn map_reference_row(row: &Row<'_>) -> rusqlite::Result<ReferenceList> {
    let extracted_at: DateTime<Utc> = row.get(4)?;

    Ok(ReferenceList {
        id: row.get(0)?,
        paper_id: row.get(1)?,
        references: list_column(row, 2)?,
        reference_count: row.get(3)?,
        extracted_at,
    })
}
