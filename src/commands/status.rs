use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::store;

pub fn run(args: StatusArgs) -> Result<()> {
    let db_path = super::resolve_db_path(&args.cache_root, args.db_path);

    info!(cache_root = %args.cache_root.display(), "status requested");

    if !db_path.exists() {
        warn!(path = %db_path.display(), "database file missing");
        return Ok(());
    }

    let connection = store::open_database(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;

    let papers = query_count(&connection, "SELECT COUNT(*) FROM papers").unwrap_or(0);
    let sections = query_count(&connection, "SELECT COUNT(*) FROM text_sections").unwrap_or(0);
    let tables = query_count(&connection, "SELECT COUNT(*) FROM table_data").unwrap_or(0);
    let images = query_count(&connection, "SELECT COUNT(*) FROM image_data").unwrap_or(0);
    let references = query_count(&connection, "SELECT COUNT(*) FROM reference_lists").unwrap_or(0);

    info!(
        path = %db_path.display(),
        papers,
        sections,
        tables,
        images,
        references,
        "database status"
    );

    Ok(())
}

fn query_count(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}
