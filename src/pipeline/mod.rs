//! The ingestion pipeline: Load -> Extract -> Resolve ->
//! {Skip | SelectiveClean -> Persist} -> Commit.
//!
//! Metadata extraction failure, an unreadable source, or any store error
//! after the transaction opens are fatal and roll the whole run back.
//! Non-metadata extraction failures degrade to empty results and a
//! recorded warning. One run owns one connection and one transaction.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::extract::Extractor;
use crate::ident::{self, ElementType};
use crate::model::{
    EntityKind, ExtractedPaper, IngestCounts, IngestReport, OverwriteSet, PaperRecord,
};
use crate::resolve::{self, DuplicateDecision, OverwritePolicy};
use crate::store;

#[cfg(test)]
mod tests;

pub struct IngestPipeline<'a> {
    extractor: &'a dyn Extractor,
    policy: &'a dyn OverwritePolicy,
}

impl<'a> IngestPipeline<'a> {
    pub fn new(extractor: &'a dyn Extractor, policy: &'a dyn OverwritePolicy) -> Self {
        IngestPipeline { extractor, policy }
    }

    pub fn run(&self, connection: &mut Connection, paper_path: &Path) -> Result<IngestReport> {
        let content = fs::read_to_string(paper_path)
            .with_context(|| format!("failed to read {}", paper_path.display()))?;
        let source_file = paper_path.display().to_string();

        // Metadata first: nothing touches the database until this holds.
        let mut paper = self
            .extractor
            .extract_metadata(&content, &source_file)
            .with_context(|| format!("metadata extraction failed for {source_file}"))?;

        info!(paper_id = paper.id, title = %paper.title, "extracted metadata");

        let mut extracted = self.extract_sub_entities(&content, paper.id);

        let tx = connection
            .transaction()
            .context("failed to open ingestion transaction")?;

        let decision = resolve::resolve(&tx, &mut paper, self.policy)
            .context("duplicate resolution failed")?;

        let report = match &decision {
            DuplicateDecision::FoundKeepAll { existing_id } => {
                info!(paper_id = existing_id, "duplicate found, keeping stored entities");
                IngestReport {
                    paper_id: *existing_id,
                    title: paper.title.clone(),
                    decision: "found-keep-all".to_string(),
                    overwritten_kinds: Vec::new(),
                    counts: IngestCounts::default(),
                    warnings: extracted.warnings.clone(),
                }
            }
            DuplicateDecision::NotFound => {
                retarget(&mut extracted, paper.id)?;
                let counts = persist_new(&tx, &paper, &extracted)?;
                IngestReport {
                    paper_id: paper.id,
                    title: paper.title.clone(),
                    decision: "not-found".to_string(),
                    overwritten_kinds: Vec::new(),
                    counts,
                    warnings: extracted.warnings.clone(),
                }
            }
            DuplicateDecision::FoundSelectiveOverwrite { existing_id, kinds } => {
                retarget(&mut extracted, *existing_id)?;
                let counts = overwrite_selected(&tx, &paper, &extracted, *kinds)?;
                IngestReport {
                    paper_id: *existing_id,
                    title: paper.title.clone(),
                    decision: "found-selective-overwrite".to_string(),
                    overwritten_kinds: kinds.labels().iter().map(|s| s.to_string()).collect(),
                    counts,
                    warnings: extracted.warnings.clone(),
                }
            }
        };

        tx.commit().context("failed to commit ingestion")?;

        info!(
            paper_id = report.paper_id,
            decision = %report.decision,
            sections = report.counts.sections_saved,
            tables = report.counts.tables_saved,
            images = report.counts.images_saved,
            "ingestion committed"
        );

        Ok(report)
    }

    /// Runs the non-metadata extraction calls, degrading each failure to
    /// an empty result with a recorded warning.
    fn extract_sub_entities(&self, content: &str, paper_id: i64) -> ExtractedPaper {
        let mut extracted = ExtractedPaper::default();

        match self.extractor.extract_sections(content, paper_id) {
            Ok(sections) => extracted.sections = sections,
            Err(err) => {
                warn!(error = %err, "section extraction failed");
                extracted
                    .warnings
                    .push(format!("sections skipped: {err}"));
            }
        }

        match self.extractor.extract_tables(content, paper_id) {
            Ok(tables) => extracted.tables = tables,
            Err(err) => {
                warn!(error = %err, "table extraction failed");
                extracted.warnings.push(format!("tables skipped: {err}"));
            }
        }

        match self.extractor.extract_images(content, paper_id) {
            Ok(images) => extracted.images = images,
            Err(err) => {
                warn!(error = %err, "image extraction failed");
                extracted.warnings.push(format!("images skipped: {err}"));
            }
        }

        match self.extractor.extract_references(content, paper_id) {
            Ok(references) => extracted.references = references,
            Err(err) => {
                warn!(error = %err, "reference extraction failed");
                extracted
                    .warnings
                    .push(format!("references skipped: {err}"));
            }
        }

        extracted
    }
}

/// Repoints extracted children at the resolved paper id. Section, table
/// and image ids are content-derived and stay valid; the reference list
/// id embeds the paper id and is rederived.
fn retarget(extracted: &mut ExtractedPaper, paper_id: i64) -> Result<()> {
    for section in &mut extracted.sections {
        section.paper_id = paper_id;
    }
    for table in &mut extracted.tables {
        table.paper_id = paper_id;
    }
    for image in &mut extracted.images {
        image.paper_id = paper_id;
    }
    if let Some(references) = &mut extracted.references {
        references.paper_id = paper_id;
        references.id =
            ident::hierarchical_id(paper_id, ElementType::Reference, references.reference_count)?;
    }
    Ok(())
}

/// Full persistence for a paper not seen before: the parent row, then
/// every child kind.
fn persist_new(
    connection: &Connection,
    paper: &PaperRecord,
    extracted: &ExtractedPaper,
) -> Result<IngestCounts> {
    store::papers::save(connection, paper).context("failed to save paper metadata")?;

    let mut counts = IngestCounts {
        sections_saved: store::sections::save_all(connection, &extracted.sections)
            .context("failed to save sections")?,
        tables_saved: store::tables::save_all(connection, &extracted.tables)
            .context("failed to save tables")?,
        images_saved: store::images::save_all(connection, &extracted.images)
            .context("failed to save images")?,
        references_saved: 0,
    };

    if let Some(references) = &extracted.references {
        store::references::save(connection, references).context("failed to save references")?;
        counts.references_saved = references.references.len();
    }

    Ok(counts)
}

/// Replaces exactly the selected kinds under the stored paper id. Child
/// rows are deleted before new rows go in; the metadata row is updated in
/// place, never deleted. The stored reference list travels with the
/// metadata kind, since it is bibliographic payload rather than a
/// separately selectable category.
fn overwrite_selected(
    connection: &Connection,
    paper: &PaperRecord,
    extracted: &ExtractedPaper,
    kinds: OverwriteSet,
) -> Result<IngestCounts> {
    let mut counts = IngestCounts::default();

    if kinds.contains(EntityKind::Sections) {
        if store::sections::exists_by_parent(connection, paper.id)? {
            let deleted = store::sections::delete_by_parent(connection, paper.id)
                .context("failed to delete stored sections")?;
            info!(paper_id = paper.id, deleted, "cleared stored sections");
        }
        counts.sections_saved = store::sections::save_all(connection, &extracted.sections)
            .context("failed to save sections")?;
    }

    if kinds.contains(EntityKind::Tables) {
        if store::tables::exists_by_parent(connection, paper.id)? {
            let deleted = store::tables::delete_by_parent(connection, paper.id)
                .context("failed to delete stored tables")?;
            info!(paper_id = paper.id, deleted, "cleared stored tables");
        }
        counts.tables_saved = store::tables::save_all(connection, &extracted.tables)
            .context("failed to save tables")?;
    }

    if kinds.contains(EntityKind::Images) {
        if store::images::exists_by_parent(connection, paper.id)? {
            let deleted = store::images::delete_by_parent(connection, paper.id)
                .context("failed to delete stored images")?;
            info!(paper_id = paper.id, deleted, "cleared stored images");
        }
        counts.images_saved = store::images::save_all(connection, &extracted.images)
            .context("failed to save images")?;
    }

    if kinds.contains(EntityKind::Metadata) {
        store::papers::update(connection, paper).context("failed to update paper metadata")?;

        if store::references::exists_by_parent(connection, paper.id)? {
            store::references::delete_by_parent(connection, paper.id)
                .context("failed to delete stored references")?;
        }
        if let Some(references) = &extracted.references {
            store::references::save(connection, references)
                .context("failed to save references")?;
            counts.references_saved = references.references.len();
        }

        info!(paper_id = paper.id, "updated paper metadata");
    }

    Ok(counts)
}
