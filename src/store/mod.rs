//! SQLite persistence adapters, one module per entity kind.
//!
//! Every operation takes `&Connection` so it runs inside whatever
//! transaction the caller owns; the ingestion pipeline wraps
//! resolve-through-persist in a single transaction and nothing here
//! commits on its own.

use std::path::Path;

use rusqlite::Connection;
use thiserror::Error;

pub mod images;
pub mod papers;
pub mod references;
pub mod sections;
pub mod tables;

#[cfg(test)]
mod tests;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(rusqlite::Error),

    /// A uniqueness constraint fired where an insert was expected to be
    /// fresh: either a hash collision or a clean/persist ordering bug.
    #[error("duplicate key: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, _)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Conflict(err.to_string())
            }
            _ => StoreError::Database(err),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

pub fn open_database(path: &Path) -> StoreResult<Connection> {
    let connection = Connection::open(path)?;
    configure_connection(&connection)?;
    Ok(connection)
}

#[cfg(test)]
pub fn open_in_memory() -> StoreResult<Connection> {
    let connection = Connection::open_in_memory()?;
    configure_connection(&connection)?;
    Ok(connection)
}

fn configure_connection(connection: &Connection) -> StoreResult<()> {
    connection.pragma_update(None, "journal_mode", "WAL")?;
    connection.pragma_update(None, "synchronous", "NORMAL")?;
    connection.pragma_update(None, "foreign_keys", "ON")?;
    Ok(())
}

/// One-time idempotent schema setup.
pub fn ensure_schema(connection: &Connection) -> StoreResult<()> {
    connection.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS papers (
          id INTEGER PRIMARY KEY,
          title TEXT NOT NULL,
          authors TEXT NOT NULL DEFAULT '[]',
          journal TEXT,
          publication_date TEXT,
          doi TEXT,
          volume TEXT,
          issue TEXT,
          pages TEXT,
          abstract TEXT,
          keywords TEXT NOT NULL DEFAULT '[]',
          source_file TEXT NOT NULL,
          extracted_at TEXT NOT NULL,
          funding_sources TEXT NOT NULL DEFAULT '[]',
          conflict_of_interest TEXT,
          data_availability TEXT,
          ethics_approval TEXT,
          registration_number TEXT,
          supplemental_materials TEXT NOT NULL DEFAULT '[]',
          created_at TEXT NOT NULL,
          updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_papers_doi ON papers(doi);
        CREATE INDEX IF NOT EXISTS idx_papers_title ON papers(title);

        CREATE TABLE IF NOT EXISTS text_sections (
          id INTEGER PRIMARY KEY,
          paper_id INTEGER NOT NULL,
          title TEXT NOT NULL,
          content TEXT NOT NULL,
          summary TEXT NOT NULL DEFAULT '',
          keywords TEXT NOT NULL DEFAULT '[]',
          section_number INTEGER NOT NULL,
          level INTEGER NOT NULL DEFAULT 1,
          word_count INTEGER NOT NULL DEFAULT 0,
          extracted_at TEXT NOT NULL,
          FOREIGN KEY(paper_id) REFERENCES papers(id) ON DELETE CASCADE,
          UNIQUE(paper_id, section_number)
        );

        CREATE INDEX IF NOT EXISTS idx_text_sections_paper ON text_sections(paper_id);

        CREATE TABLE IF NOT EXISTS table_data (
          id INTEGER PRIMARY KEY,
          paper_id INTEGER NOT NULL,
          table_number INTEGER NOT NULL,
          title TEXT NOT NULL,
          raw_content TEXT NOT NULL,
          summary TEXT NOT NULL DEFAULT '',
          context_analysis TEXT NOT NULL DEFAULT '',
          statistical_findings TEXT NOT NULL DEFAULT '',
          keywords TEXT NOT NULL DEFAULT '[]',
          column_count INTEGER NOT NULL DEFAULT 0,
          row_count INTEGER NOT NULL DEFAULT 0,
          extracted_at TEXT NOT NULL,
          FOREIGN KEY(paper_id) REFERENCES papers(id) ON DELETE CASCADE,
          UNIQUE(paper_id, table_number)
        );

        CREATE INDEX IF NOT EXISTS idx_table_data_paper ON table_data(paper_id);

        CREATE TABLE IF NOT EXISTS image_data (
          id INTEGER PRIMARY KEY,
          paper_id INTEGER NOT NULL,
          image_number INTEGER NOT NULL,
          alt_text TEXT NOT NULL DEFAULT '',
          image_data TEXT NOT NULL,
          image_format TEXT NOT NULL DEFAULT '',
          summary TEXT NOT NULL DEFAULT '',
          graphic_analysis TEXT NOT NULL DEFAULT '',
          statistical_analysis TEXT NOT NULL DEFAULT '',
          contextual_relevance TEXT NOT NULL DEFAULT '',
          keywords TEXT NOT NULL DEFAULT '[]',
          extracted_at TEXT NOT NULL,
          FOREIGN KEY(paper_id) REFERENCES papers(id) ON DELETE CASCADE,
          UNIQUE(paper_id, image_number)
        );

        CREATE INDEX IF NOT EXISTS idx_image_data_paper ON image_data(paper_id);

        CREATE TABLE IF NOT EXISTS reference_lists (
          id INTEGER PRIMARY KEY,
          paper_id INTEGER NOT NULL,
          entries TEXT NOT NULL DEFAULT '[]',
          reference_count INTEGER NOT NULL DEFAULT 0,
          extracted_at TEXT NOT NULL,
          FOREIGN KEY(paper_id) REFERENCES papers(id) ON DELETE CASCADE,
          UNIQUE(paper_id)
        );
        ",
    )?;

    Ok(())
}

pub(crate) fn json_list(values: &[String]) -> StoreResult<String> {
    Ok(serde_json::to_string(values)?)
}

pub(crate) fn list_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
    })
}

pub(crate) fn count_rows(connection: &Connection, sql: &str, paper_id: i64) -> StoreResult<usize> {
    let count: i64 = connection.query_row(sql, [paper_id], |row| row.get(0))?;
    Ok(count as usize)
}
