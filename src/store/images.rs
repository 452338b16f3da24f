use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};
use tracing::warn;

use crate::model::ImageRecord;

use super::{StoreResult, count_rows, json_list, list_column};

pub fn exists_by_parent(connection: &Connection, paper_id: i64) -> StoreResult<bool> {
    Ok(count_by_parent(connection, paper_id)? > 0)
}

pub fn count_by_parent(connection: &Connection, paper_id: i64) -> StoreResult<usize> {
    count_rows(
        connection,
        "SELECT COUNT(*) FROM image_data WHERE paper_id = ?1",
        paper_id,
    )
}

pub fn find_by_parent(connection: &Connection, paper_id: i64) -> StoreResult<Vec<ImageRecord>> {
    let mut statement = connection.prepare(
        "
        SELECT id, paper_id, image_number, alt_text, image_data, image_format,
               summary, graphic_analysis, statistical_analysis,
               contextual_relevance, keywords, extracted_at
        FROM image_data
        WHERE paper_id = ?1
        ORDER BY image_number
        ",
    )?;
    let rows = statement.query_map([paper_id], map_image_row)?;

    let mut images = Vec::new();
    for row in rows {
        images.push(row?);
    }
    Ok(images)
}

pub fn save(connection: &Connection, image: &ImageRecord) -> StoreResult<()> {
    connection.execute(
        "
        INSERT INTO image_data (
          id, paper_id, image_number, alt_text, image_data, image_format,
          summary, graphic_analysis, statistical_analysis,
          contextual_relevance, keywords, extracted_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        ON CONFLICT(id) DO UPDATE SET
          paper_id = excluded.paper_id,
          image_number = excluded.image_number,
          alt_text = excluded.alt_text,
          image_data = excluded.image_data,
          image_format = excluded.image_format,
          summary = excluded.summary,
          graphic_analysis = excluded.graphic_analysis,
          statistical_analysis = excluded.statistical_analysis,
          contextual_relevance = excluded.contextual_relevance,
          keywords = excluded.keywords,
          extracted_at = excluded.extracted_at
        ",
        params![
            image.id,
            image.paper_id,
            image.image_number,
            image.alt_text,
            image.image_data,
            image.image_format,
            image.summary,
            image.graphic_analysis,
            image.statistical_analysis,
            image.contextual_relevance,
            json_list(&image.keywords)?,
            image.extracted_at,
        ],
    )?;
    Ok(())
}

pub fn save_all(connection: &Connection, images: &[ImageRecord]) -> StoreResult<usize> {
    let mut saved = 0;
    for image in images {
        if let Err(err) = save(connection, image) {
            warn!(
                saved,
                total = images.len(),
                image = image.image_number,
                "image batch aborted"
            );
            return Err(err);
        }
        saved += 1;
    }
    Ok(saved)
}

pub fn delete_by_parent(connection: &Connection, paper_id: i64) -> StoreResult<usize> {
    let deleted = connection.execute("DELETE FROM image_data WHERE paper_id = ?1", [paper_id])?;
    Ok(deleted)
}

fn map_image_row(row: &Row<'_>) -> rusqlite::Result<ImageRecord> {
    let extracted_at: DateTime<Utc> = row.get(11)?;

    Ok(ImageRecord {
        id: row.get(0)?,
        paper_id: row.get(1)?,
        image_number: row.get(2)?,
        alt_text: row.get(3)?,
        image_data: row.get(4)?,
        image_format: row.get(5)?,
        summary: row.get(6)?,
        graphic_analysis: row.get(7)?,
        statistical_analysis: row.get(8)?,
        contextual_relevance: row.get(9)?,
        keywords: list_column(row, 10)?,
        extracted_at,
    })
}
