use chrono::Utc;

use super::{StoreError, ensure_schema, open_in_memory, papers, sections, tables};
use crate::model::{PaperRecord, SectionRecord, TableRecord};

fn sample_paper(id: i64, title: &str, doi: Option<&str>) -> PaperRecord {
    PaperRecord {
        id,
        title: title.to_string(),
        authors: vec!["Smith J".to_string()],
        journal: Some("J Burn Care".to_string()),
        publication_date: None,
        doi: doi.map(ToOwned::to_owned),
        volume: None,
        issue: None,
        pages: None,
        abstract_text: None,
        keywords: vec!["burns".to_string()],
        source_file: "sample.md".to_string(),
        extracted_at: Utc::now(),
        funding_sources: Vec::new(),
        conflict_of_interest: None,
        data_availability: None,
        ethics_approval: None,
        registration_number: None,
        supplemental_materials: Vec::new(),
    }
}

fn sample_section(id: i64, paper_id: i64, number: u32) -> SectionRecord {
    SectionRecord {
        id,
        paper_id,
        title: format!("Section {number}"),
        content: format!("Content of section {number}."),
        summary: String::new(),
        keywords: Vec::new(),
        section_number: number,
        level: 1,
        word_count: 4,
        extracted_at: Utc::now(),
    }
}

fn sample_table(id: i64, paper_id: i64, number: u32) -> TableRecord {
    TableRecord {
        id,
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

#[test]
fn resaving_the_same_section_id_is_an_update() {
    let conn = open_in_memory().unwrap();
    ensure_schema(&conn).unwrap();
    papers::save(&conn, &sample_paper(1, "P", None)).unwrap();

    let mut section = sample_section(11, 1, 1);
    sections::save(&conn, &section).unwrap();

    section.content = "revised content".to_string();
    sections::save(&conn, &section).unwrap();

    assert_eq!(sections::count_by_parent(&conn, 1).unwrap(), 1);
    let stored = sections::find_by_parent(&conn, 1).unwrap();
    assert_eq!(stored[0].content, "revised content");
}

#[test]
fn positional_clash_with_a_different_id_is_a_conflict() {
    let conn = open_in_memory().unwrap();
    ensure_schema(&conn).unwrap();
    papers::save(&conn, &sample_paper(1, "P", None)).unwrap();

    sections::save(&conn, &sample_section(11, 1, 1)).unwrap();
    let err = sections::save(&conn, &sample_section(12, 1, 1)).unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
}

#[test]
fn duplicate_paper_id_is_a_conflict() {
    let conn = open_in_memory().unwrap();
    ensure_schema(&conn).unwrap();

    papers::save(&conn, &sample_paper(1, "First", None)).unwrap();
    let err = papers::save(&conn, &sample_paper(1, "Second", None)).unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
}

#[test]
fn updating_a_missing_paper_reports_not_found() {
    let conn = open_in_memory().unwrap();
    ensure_schema(&conn).unwrap();

    let err = papers::update(&conn, &sample_paper(9, "Ghost", None)).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[test]
fn update_replaces_the_mutable_fields() {
    let conn = open_in_memory().unwrap();
    ensure_schema(&conn).unwrap();
    papers::save(&conn, &sample_paper(1, "Original", Some("10.1/a"))).unwrap();

    let mut revised = sample_paper(1, "Revised", Some("10.1/b"));
    revised.authors = vec!["Doe A".to_string(), "Smith J".to_string()];
    papers::update(&conn, &revised).unwrap();

    let stored = papers::find_by_id(&conn, 1).unwrap().unwrap();
    assert_eq!(stored.title, "Revised");
    assert_eq!(stored.doi.as_deref(), Some("10.1/b"));
    assert_eq!(stored.authors.len(), 2);
}

#[test]
fn lookups_by_doi_and_title_are_exact() {
    let conn = open_in_memory().unwrap();
    ensure_schema(&conn).unwrap();
    papers::save(&conn, &sample_paper(1, "Exact Title", Some("10.1/x"))).unwrap();

    assert!(papers::exists_by_doi(&conn, "10.1/x").unwrap());
    assert!(!papers::exists_by_doi(&conn, "10.1/y").unwrap());
    assert!(papers::exists_by_title(&conn, "Exact Title").unwrap());
    assert!(!papers::exists_by_title(&conn, "exact title").unwrap());
}

#[test]
fn deleting_children_by_parent_reports_the_row_count() {
    let conn = open_in_memory().unwrap();
    ensure_schema(&conn).unwrap();
    papers::save(&conn, &sample_paper(1, "P", None)).unwrap();

    for number in 1..=3 {
        sections::save(&conn, &sample_section(10 + i64::from(number), 1, number)).unwrap();
    }
    assert!(sections::exists_by_parent(&conn, 1).unwrap());

    let deleted = sections::delete_by_parent(&conn, 1).unwrap();
    assert_eq!(deleted, 3);
    assert_eq!(sections::count_by_parent(&conn, 1).unwrap(), 0);
    assert!(!sections::exists_by_parent(&conn, 1).unwrap());
}

#[test]
fn deleting_a_paper_cascades_to_its_children() {
    let conn = open_in_memory().unwrap();
    ensure_schema(&conn).unwrap();
    papers::save(&conn, &sample_paper(1, "P", None)).unwrap();
    sections::save(&conn, &sample_section(11, 1, 1)).unwrap();
    tables::save(&conn, &sample_table(21, 1, 1)).unwrap();

    conn.execute("DELETE FROM papers WHERE id = ?1", [1_i64])
        .unwrap();

    assert_eq!(sections::count_by_parent(&conn, 1).unwrap(), 0);
    assert_eq!(tables::count_by_parent(&conn, 1).unwrap(), 0);
}

#[test]
fn child_rows_require_an_existing_parent() {
    let conn = open_in_memory().unwrap();
    ensure_schema(&conn).unwrap();

    let err = sections::save(&conn, &sample_section(11, 404, 1)).unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
}
