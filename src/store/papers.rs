use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::model::PaperRecord;

use super::{StoreError, StoreResult, json_list, list_column};

const SELECT_COLUMNS: &str = "
    id, title, authors, journal, publication_date, doi, volume, issue, pages,
    abstract, keywords, source_file, extracted_at, funding_sources,
    conflict_of_interest, data_availability, ethics_approval,
    registration_number, supplemental_materials
";

pub fn exists_by_doi(connection: &Connection, doi: &str) -> StoreResult<bool> {
    let exists: bool = connection.query_row(
        "SELECT EXISTS(SELECT 1 FROM papers WHERE doi = ?1)",
        [doi],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn exists_by_title(connection: &Connection, title: &str) -> StoreResult<bool> {
    let exists: bool = connection.query_row(
        "SELECT EXISTS(SELECT 1 FROM papers WHERE title = ?1)",
        [title],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn find_by_doi(connection: &Connection, doi: &str) -> StoreResult<Option<PaperRecord>> {
    let sql = format!("SELECT {SELECT_COLUMNS} FROM papers WHERE doi = ?1");
    let paper = connection
        .query_row(&sql, [doi], map_paper_row)
        .optional()?;
    Ok(paper)
}

/// Exact, case-sensitive title match.
pub fn find_by_title(connection: &Connection, title: &str) -> StoreResult<Option<PaperRecord>> {
    let sql = format!("SELECT {SELECT_COLUMNS} FROM papers WHERE title = ?1");
    let paper = connection
        .query_row(&sql, [title], map_paper_row)
        .optional()?;
    Ok(paper)
}

pub fn find_by_id(connection: &Connection, paper_id: i64) -> StoreResult<Option<PaperRecord>> {
    let sql = format!("SELECT {SELECT_COLUMNS} FROM papers WHERE id = ?1");
    let paper = connection
        .query_row(&sql, [paper_id], map_paper_row)
        .optional()?;
    Ok(paper)
}

pub fn list_recent(connection: &Connection, limit: usize) -> StoreResult<Vec<PaperRecord>> {
    let sql = format!("SELECT {SELECT_COLUMNS} FROM papers ORDER BY extracted_at DESC LIMIT ?1");
    let mut statement = connection.prepare(&sql)?;
    let rows = statement.query_map([limit as i64], map_paper_row)?;

    let mut papers = Vec::new();
    for row in rows {
        papers.push(row?);
    }
    Ok(papers)
}

/// Plain insert. A primary-key clash here means a content-hash collision
/// (or a duplicate-detection miss) and surfaces as `StoreError::Conflict`.
pub fn save(connection: &Connection, paper: &PaperRecord) -> StoreResult<()> {
    let now = Utc::now();
    connection.execute(
        "
        INSERT INTO papers (
          id, title, authors, journal, publication_date, doi, volume, issue,
          pages, abstract, keywords, source_file, extracted_at,
          funding_sources, conflict_of_interest, data_availability,
          ethics_approval, registration_number, supplemental_materials,
          created_at, updated_at
        ) VALUES (
          ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
          ?16, ?17, ?18, ?19, ?20, ?21
        )
        ",
        params![
            paper.id,
            paper.title,
            json_list(&paper.authors)?,
            paper.journal,
            paper.publication_date,
            paper.doi,
            paper.volume,
            paper.issue,
            paper.pages,
            paper.abstract_text,
            json_list(&paper.keywords)?,
            paper.source_file,
            paper.extracted_at,
            json_list(&paper.funding_sources)?,
            paper.conflict_of_interest,
            paper.data_availability,
            paper.ethics_approval,
            paper.registration_number,
            json_list(&paper.supplemental_materials)?,
            now,
            now,
        ],
    )?;
    Ok(())
}

/// Full replace of the mutable fields, bumping `updated_at`. The row id
/// never changes here.
pub fn update(connection: &Connection, paper: &PaperRecord) -> StoreResult<()> {
    let affected = connection.execute(
        "
        UPDATE papers SET
          title = ?2, authors = ?3, journal = ?4, publication_date = ?5,
          doi = ?6, volume = ?7, issue = ?8, pages = ?9, abstract = ?10,
          keywords = ?11, source_file = ?12, extracted_at = ?13,
          funding_sources = ?14, conflict_of_interest = ?15,
          data_availability = ?16, ethics_approval = ?17,
          registration_number = ?18, supplemental_materials = ?19,
          updated_at = ?20
        WHERE id = ?1
        ",
        params![
            paper.id,
            paper.title,
            json_list(&paper.authors)?,
            paper.journal,
            paper.publication_date,
            paper.doi,
            paper.volume,
            paper.issue,
            paper.pages,
            paper.abstract_text,
            json_list(&paper.keywords)?,
            paper.source_file,
            paper.extracted_at,
            json_list(&paper.funding_sources)?,
            paper.conflict_of_interest,
            paper.data_availability,
            paper.ethics_approval,
            paper.registration_number,
            json_list(&paper.supplemental_materials)?,
            Utc::now(),
        ],
    )?;

    if affected == 0 {
        return Err(StoreError::NotFound(format!(
            "paper {} not present for update",
            paper.id
        )));
    }
    Ok(())
}

fn map_paper_row(row: &Row<'_>) -> rusqlite::Result<PaperRecord> {
    let extracted_at: DateTime<Utc> = row.get(12)?;

    Ok(PaperRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        authors: list_column(row, 2)?,
        journal: row.get(3)?,
        publication_date: row.get(4)?,
        doi: row.get(5)?,
        volume: row.get(6)?,
        issue: row.get(7)?,
        pages: row.get(8)?,
        abstract_text: row.get(9)?,
        keywords: list_column(row, 10)?,
        source_file: row.get(11)?,
        extracted_at,
        funding_sources: list_column(row, 13)?,
        conflict_of_interest: row.get(14)?,
        data_availability: row.get(15)?,
        ethics_approval: row.get(16)?,
        registration_number: row.get(17)?,
        supplemental_materials: list_column(row, 18)?,
    })
}
