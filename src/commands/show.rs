use anyhow::{Context, Result, bail};
use tracing::info;

use crate::cli::ShowArgs;
use crate::store;

pub fn run(args: ShowArgs) -> Result<()> {
    let db_path = super::resolve_db_path(&args.cache_root, args.db_path);

    if !db_path.exists() {
        bail!("database not found: {}", db_path.display());
    }

    let connection = store::open_database(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;

    let Some(paper) = store::papers::find_by_id(&connection, args.paper_id)? else {
        bail!(
            "paper {} not found in {}",
            args.paper_id,
            db_path.display()
        );
    };

    info!(
        id = paper.id,
        title = %paper.title,
        authors = %paper.authors.join("; "),
        journal = %paper.journal.as_deref().unwrap_or("-"),
        publication_date = %paper.publication_date.as_deref().unwrap_or("-"),
        doi = %paper.doi.as_deref().unwrap_or("-"),
        keywords = %paper.keywords.join(", "),
        source_file = %paper.source_file,
        extracted_at = %paper.extracted_at,
        "paper"
    );

    let sections = store::sections::find_by_parent(&connection, paper.id)?;
    for section in &sections {
        info!(
            number = section.section_number,
            level = section.level,
            title = %section.title,
            words = section.word_count,
            "section"
        );
    }

    let tables = store::tables::find_by_parent(&connection, paper.id)?;
    for table in &tables {
        info!(
            number = table.table_number,
            title = %table.title,
            columns = table.column_count,
            rows = table.row_count,
            "table"
        );
    }

    let images = store::images::find_by_parent(&connection, paper.id)?;
    for image in &images {
        info!(
            number = image.image_number,
            alt = %image.alt_text,
            format = %image.image_format,
            "image"
        );
    }

    let references = store::references::find_by_parent(&connection, paper.id)?;
    if let Some(list) = &references {
        info!(count = list.reference_count, "references");
    }

    info!(
        sections = sections.len(),
        tables = tables.len(),
        images = images.len(),
        references = references.map(|list| list.references.len()).unwrap_or(0),
        "paper detail complete"
    );

    Ok(())
}
