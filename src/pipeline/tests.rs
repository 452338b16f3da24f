use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use rusqlite::Connection;
use tempfile::TempDir;

use super::IngestPipeline;
use crate::config::AnalyzerConfig;
use crate::extract::{
    ExtractError, ExtractResult, Extractor, HeuristicAnalyzer, MarkdownExtractor,
};
use crate::ident;
use crate::model::{
    EntityKind, ImageRecord, IngestCounts, OverwriteSet, PaperRecord, ReferenceList,
    SectionRecord, TableRecord,
};
use crate::resolve::{FixedOverwrite, KeepExisting};
use crate::store::{self, ensure_schema, open_in_memory};

const PAPER_V1: &str = "\
Title: Burn Outcomes in Adults
DOI: 10.5/burn.2024
Authors: Smith J, Doe A

# Introduction

Intro text on burn outcomes.

# Methods

Cohort design and statistics.

# Results

Results narrative.

| Group | N | Mortality |
|-------|---|-----------|
| Control | 120 | 12% |
| Treated | 118 | 8% |

| Age band | Count |
|----------|-------|
| 18-34 | 57 |
| 35-60 | 63 |
";

const PAPER_V2: &str = "\
Title: Burn Outcomes in Adults
DOI: 10.5/burn.2024
Authors: Smith J, Doe A

# Introduction

Intro text on burn outcomes.

# Methods

Cohort design and statistics.

# Results

Results narrative, revised after re-review.

| Group | N | Mortality |
|-------|---|-----------|
| Control | 140 | 11% |
| Treated | 139 | 6% |

| Age band | Count |
|----------|-------|
| 18-34 | 70 |
| 35-60 | 69 |
";

const PAPER_FULL: &str = "\
Title: Fluid Resuscitation After Burn Injury
DOI: 10.9/fluid.2023
Authors: Chen L, Garcia M

# Abstract

Background and aims of resuscitation strategies.

# Findings

Narrative findings.

![Figure 1: resuscitation flow](data:image/png;base64,aGVsbG8=)

## References

1. Smith A. Burn care. 2024.
2. Jones B. Fluids. 2023.
";

fn write_paper(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn open_store() -> Connection {
    let conn = open_in_memory().unwrap();
    ensure_schema(&conn).unwrap();
    conn
}

fn markdown_extractor() -> MarkdownExtractor {
    MarkdownExtractor::new(&AnalyzerConfig::default(), Box::new(HeuristicAnalyzer)).unwrap()
}

fn total(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

fn stub_paper(id: i64, title: &str, source_file: &str) -> PaperRecord {
    PaperRecord {
        id,
        title: title.to_string(),
        authors: Vec::new(),
        journal: None,
        publication_date: None,
        doi: None,
        volume: None,
        issue: None,
        pages: None,
        abstract_text: None,
        keywords: Vec::new(),
        source_file: source_file.to_string(),
        extracted_at: Utc::now(),
        funding_sources: Vec::new(),
        conflict_of_interest: None,
        data_availability: None,
        ethics_approval: None,
        registration_number: None,
        supplemental_materials: Vec::new(),
    }
}

fn stub_section(paper_id: i64, number: u32) -> SectionRecord {
    SectionRecord {
        id: ident::content_id(&format!("section body {number}"), "stub_section"),
        paper_id,
        title: format!("Section {number}"),
        content: format!("Body {number}"),
        summary: String::new(),
        keywords: Vec::new(),
        section_number: number,
        level: 1,
        word_count: 2,
        extracted_at: Utc::now(),
    }
}

fn stub_table(paper_id: i64, number: u32) -> TableRecord {
    TableRecord {
        id: ident::content_id(&format!("table body {number}"), "stub_table"),
        paper_id,
        table_number: number,
        title: format!("Table {number}"),
        raw_content: "| a | b |".to_string(),
        summary: String::new(),
        context_analysis: String::new(),
        statistical_findings: String::new(),
        keywords: Vec::new(),
        column_count: 2,
        row_count: 1,
        extracted_at: Utc::now(),
    }
}

/// The second of three tables repeats position 1 under a different id, so
/// its insert trips the positional uniqueness constraint mid-persist.
struct ConflictingTables;

impl Extractor for ConflictingTables {
    fn extract_metadata(&self, content: &str, source_file: &str) -> ExtractResult<PaperRecord> {
        Ok(stub_paper(
            ident::paper_id(content, source_file),
            "Conflicted run",
            source_file,
        ))
    }

    fn extract_sections(&self, _content: &str, paper_id: i64) -> ExtractResult<Vec<SectionRecord>> {
        Ok(vec![stub_section(paper_id, 1), stub_section(paper_id, 2)])
    }

    fn extract_tables(&self, _content: &str, paper_id: i64) -> ExtractResult<Vec<TableRecord>> {
        let mut duplicate = stub_table(paper_id, 1);
        duplicate.id = ident::content_id("another table body", "stub_table_dup");
        Ok(vec![
            stub_table(paper_id, 1),
            duplicate,
            stub_table(paper_id, 3),
        ])
    }

    fn extract_images(&self, _content: &str, _paper_id: i64) -> ExtractResult<Vec<ImageRecord>> {
        Ok(Vec::new())
    }

    fn extract_references(
        &self,
        _content: &str,
        _paper_id: i64,
    ) -> ExtractResult<Option<ReferenceList>> {
        Ok(None)
    }
}

struct OfflineTableBackend;

impl Extractor for OfflineTableBackend {
    fn extract_metadata(&self, content: &str, source_file: &str) -> ExtractResult<PaperRecord> {
        Ok(stub_paper(
            ident::paper_id(content, source_file),
            "Degraded run",
            source_file,
        ))
    }

    fn extract_sections(&self, _content: &str, paper_id: i64) -> ExtractResult<Vec<SectionRecord>> {
        Ok(vec![stub_section(paper_id, 1)])
    }

    fn extract_tables(&self, _content: &str, _paper_id: i64) -> ExtractResult<Vec<TableRecord>> {
        Err(ExtractError::Analysis("table backend offline".to_string()))
    }

    fn extract_images(&self, _content: &str, _paper_id: i64) -> ExtractResult<Vec<ImageRecord>> {
        Ok(Vec::new())
    }

    fn extract_references(
        &self,
        _content: &str,
        _paper_id: i64,
    ) -> ExtractResult<Option<ReferenceList>> {
        Ok(None)
    }
}

#[test]
fn fresh_document_persists_every_entity_kind() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_paper(&dir, "full.md", PAPER_FULL);
    let mut conn = open_store();

    let extractor = markdown_extractor();
    let pipeline = IngestPipeline::new(&extractor, &KeepExisting);
    let report = pipeline.run(&mut conn, &path).unwrap();

    assert_eq!(report.decision, "not-found");
    assert_eq!(report.counts.sections_saved, 3);
    assert_eq!(report.counts.images_saved, 1);
    assert_eq!(report.counts.references_saved, 2);
    assert_eq!(report.counts.tables_saved, 0);
    assert!(report.warnings.is_empty());

    assert_eq!(total(&conn, "papers"), 1);
    assert_eq!(total(&conn, "text_sections"), 3);
    assert_eq!(total(&conn, "image_data"), 1);
    assert_eq!(total(&conn, "reference_lists"), 1);

    let stored = store::papers::find_by_id(&conn, report.paper_id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.doi.as_deref(), Some("10.9/fluid.2023"));
}

#[test]
fn reingesting_identical_content_with_keep_policy_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_paper(&dir, "a.md", "Title: A\nDOI: 10.1/x\n\n# Introduction\nShort body.\n");
    let mut conn = open_store();

    let extractor = markdown_extractor();
    let pipeline = IngestPipeline::new(&extractor, &KeepExisting);

    let first = pipeline.run(&mut conn, &path).unwrap();
    assert_eq!(first.decision, "not-found");
    assert_eq!(total(&conn, "papers"), 1);

    let stored = store::papers::find_by_doi(&conn, "10.1/x").unwrap().unwrap();
    assert_eq!(stored.title, "A");
    assert_eq!(stored.id, first.paper_id);

    let second = pipeline.run(&mut conn, &path).unwrap();
    assert_eq!(second.decision, "found-keep-all");
    assert_eq!(second.paper_id, first.paper_id);
    assert_eq!(second.counts, IngestCounts::default());

    assert_eq!(total(&conn, "papers"), 1);
    assert_eq!(
        store::sections::count_by_parent(&conn, first.paper_id).unwrap(),
        first.counts.sections_saved
    );
}

#[test]
fn doi_match_wins_over_a_differing_title() {
    let dir = tempfile::tempdir().unwrap();
    let first_path = write_paper(&dir, "a.md", "Title: A\nDOI: 10.1/x\n\n# Introduction\nBody.\n");
    let second_path = write_paper(
        &dir,
        "b.md",
        "Title: Completely Different\nDOI: 10.1/x\n\n# Introduction\nBody.\n",
    );
    let mut conn = open_store();

    let extractor = markdown_extractor();
    let pipeline = IngestPipeline::new(&extractor, &KeepExisting);

    let first = pipeline.run(&mut conn, &first_path).unwrap();
    let second = pipeline.run(&mut conn, &second_path).unwrap();

    assert_eq!(second.decision, "found-keep-all");
    assert_eq!(second.paper_id, first.paper_id);
    assert_eq!(total(&conn, "papers"), 1);
}

#[test]
fn overwriting_tables_replaces_them_and_leaves_sections_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_paper(&dir, "burn.md", PAPER_V1);
    let mut conn = open_store();
    let extractor = markdown_extractor();

    let first = {
        let pipeline = IngestPipeline::new(&extractor, &KeepExisting);
        pipeline.run(&mut conn, &path).unwrap()
    };
    assert_eq!(first.counts.sections_saved, 3);
    assert_eq!(first.counts.tables_saved, 2);

    let sections_before = store::sections::find_by_parent(&conn, first.paper_id).unwrap();
    let tables_before = store::tables::find_by_parent(&conn, first.paper_id).unwrap();

    fs::write(&path, PAPER_V2).unwrap();
    let policy = FixedOverwrite(OverwriteSet::of(&[EntityKind::Tables]));
    let pipeline = IngestPipeline::new(&extractor, &policy);
    let second = pipeline.run(&mut conn, &path).unwrap();

    assert_eq!(second.decision, "found-selective-overwrite");
    assert_eq!(second.paper_id, first.paper_id);
    assert_eq!(second.overwritten_kinds, vec!["tables"]);
    assert_eq!(second.counts.tables_saved, 2);
    assert_eq!(second.counts.sections_saved, 0);

    let sections_after = store::sections::find_by_parent(&conn, first.paper_id).unwrap();
    assert_eq!(sections_after, sections_before);

    let tables_after = store::tables::find_by_parent(&conn, first.paper_id).unwrap();
    assert_eq!(tables_after.len(), 2);
    assert_ne!(tables_after[0].raw_content, tables_before[0].raw_content);
    assert!(tables_after[0].raw_content.contains("140"));
}

#[test]
fn overwriting_metadata_updates_the_stored_row_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_paper(&dir, "burn.md", PAPER_V1);
    let mut conn = open_store();
    let extractor = markdown_extractor();

    let first = {
        let pipeline = IngestPipeline::new(&extractor, &KeepExisting);
        pipeline.run(&mut conn, &path).unwrap()
    };

    let revised = PAPER_V1.replace(
        "Title: Burn Outcomes in Adults",
        "Title: Burn Outcomes in Adults, Revisited",
    );
    fs::write(&path, &revised).unwrap();

    let policy = FixedOverwrite(OverwriteSet::of(&[EntityKind::Metadata]));
    let pipeline = IngestPipeline::new(&extractor, &policy);
    let second = pipeline.run(&mut conn, &path).unwrap();

    assert_eq!(second.decision, "found-selective-overwrite");
    assert_eq!(second.counts, IngestCounts::default());

    let stored = store::papers::find_by_id(&conn, first.paper_id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.title, "Burn Outcomes in Adults, Revisited");
    assert_eq!(total(&conn, "papers"), 1);
    assert_eq!(
        store::sections::count_by_parent(&conn, first.paper_id).unwrap(),
        3
    );
    assert_eq!(
        store::tables::count_by_parent(&conn, first.paper_id).unwrap(),
        2
    );
}

#[test]
fn overwriting_metadata_refreshes_the_reference_list() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_paper(&dir, "fluid.md", PAPER_FULL);
    let mut conn = open_store();
    let extractor = markdown_extractor();

    let first = {
        let pipeline = IngestPipeline::new(&extractor, &KeepExisting);
        pipeline.run(&mut conn, &path).unwrap()
    };
    assert_eq!(first.counts.references_saved, 2);

    let revised = PAPER_FULL.replace(
        "2. Jones B. Fluids. 2023.",
        "2. Jones B. Fluids, second edition. 2025.\n3. Park S. Outcomes. 2024.",
    );
    fs::write(&path, &revised).unwrap();

    let policy = FixedOverwrite(OverwriteSet::of(&[EntityKind::Metadata]));
    let pipeline = IngestPipeline::new(&extractor, &policy);
    let second = pipeline.run(&mut conn, &path).unwrap();

    assert_eq!(second.decision, "found-selective-overwrite");
    assert_eq!(second.counts.references_saved, 3);
    assert_eq!(second.counts.sections_saved, 0);

    let stored = store::references::find_by_parent(&conn, first.paper_id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.reference_count, 3);
    assert!(stored.references[1].contains("second edition"));
    assert_eq!(total(&conn, "reference_lists"), 1);
}

#[test]
fn mid_persist_table_conflict_rolls_back_the_whole_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_paper(&dir, "c.md", "Title: C\n\n# Body\ntext\n");
    let mut conn = open_store();

    let pipeline = IngestPipeline::new(&ConflictingTables, &KeepExisting);
    let err = pipeline.run(&mut conn, &path).unwrap_err();
    assert!(format!("{err:#}").contains("duplicate key"));

    assert_eq!(total(&conn, "papers"), 0);
    assert_eq!(total(&conn, "text_sections"), 0);
    assert_eq!(total(&conn, "table_data"), 0);
}

#[test]
fn failed_table_extraction_degrades_to_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_paper(&dir, "d.md", "Title: D\n\n# Body\ntext\n");
    let mut conn = open_store();

    let pipeline = IngestPipeline::new(&OfflineTableBackend, &KeepExisting);
    let report = pipeline.run(&mut conn, &path).unwrap();

    assert_eq!(report.counts.tables_saved, 0);
    assert_eq!(report.counts.sections_saved, 1);
    assert!(report
        .warnings
        .iter()
        .any(|warning| warning.contains("tables skipped")));
    assert_eq!(total(&conn, "papers"), 1);
    assert_eq!(total(&conn, "table_data"), 0);
}

#[test]
fn unreadable_source_fails_before_any_database_state() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.md");
    let mut conn = open_store();

    let extractor = markdown_extractor();
    let pipeline = IngestPipeline::new(&extractor, &KeepExisting);
    let err = pipeline.run(&mut conn, &missing).unwrap_err();

    assert!(err.to_string().contains("failed to read"));
    assert_eq!(total(&conn, "papers"), 0);
}
