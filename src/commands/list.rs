use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::ListArgs;
use crate::store;

pub fn run(args: ListArgs) -> Result<()> {
    let db_path = super::resolve_db_path(&args.cache_root, args.db_path);

    if !db_path.exists() {
        warn!(path = %db_path.display(), "database file missing");
        return Ok(());
    }

    let connection = store::open_database(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;

    let papers = store::papers::list_recent(&connection, args.limit)?;
    if papers.is_empty() {
        info!("no papers stored");
        return Ok(());
    }

    for paper in &papers {
        info!(
            id = paper.id,
            title = %paper.title,
            first_author = %paper.authors.first().map(String::as_str).unwrap_or("-"),
            author_count = paper.authors.len(),
            doi = %paper.doi.as_deref().unwrap_or("-"),
            extracted_at = %paper.extracted_at,
            "paper"
        );
    }

    info!(count = papers.len(), "listed papers");
    Ok(())
}
