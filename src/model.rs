use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Extracted bibliographic metadata for one paper. This is the parent
/// entity every other record hangs off; `id` is stable for a given
/// (source locator, content prefix) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperRecord {
    pub id: i64,
    pub title: String,
    pub authors: Vec<String>,
    pub journal: Option<String>,
    pub publication_date: Option<String>,
    pub doi: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
    pub abstract_text: Option<String>,
    pub keywords: Vec<String>,
    pub source_file: String,
    pub extracted_at: DateTime<Utc>,
    pub funding_sources: Vec<String>,
    pub conflict_of_interest: Option<String>,
    pub data_availability: Option<String>,
    pub ethics_approval: Option<String>,
    pub registration_number: Option<String>,
    pub supplemental_materials: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionRecord {
    pub id: i64,
    pub paper_id: i64,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub keywords: Vec<String>,
    /// 1-based document order, assigned by extraction.
    pub section_number: u32,
    pub level: u32,
    pub word_count: u32,
    pub extracted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRecord {
    pub id: i64,
    pub paper_id: i64,
    pub table_number: u32,
    pub title: String,
    pub raw_content: String,
    pub summary: String,
    pub context_analysis: String,
    pub statistical_findings: String,
    pub keywords: Vec<String>,
    pub column_count: u32,
    pub row_count: u32,
    pub extracted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub id: i64,
    pub paper_id: i64,
    pub image_number: u32,
    pub alt_text: String,
    /// Base64 payload, kept encoded as it appeared in the source markup.
    pub image_data: String,
    pub image_format: String,
    pub summary: String,
    pub graphic_analysis: String,
    pub statistical_analysis: String,
    pub contextual_relevance: String,
    pub keywords: Vec<String>,
    pub extracted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceList {
    pub id: i64,
    pub paper_id: i64,
    pub references: Vec<String>,
    pub reference_count: u32,
    pub extracted_at: DateTime<Utc>,
}

/// Everything one extraction pass produced for a document. Sub-entity
/// lists may be empty when their extraction degraded; `warnings` records
/// why.
#[derive(Debug, Clone, Default)]
pub struct ExtractedPaper {
    pub sections: Vec<SectionRecord>,
    pub tables: Vec<TableRecord>,
    pub images: Vec<ImageRecord>,
    pub references: Option<ReferenceList>,
    pub warnings: Vec<String>,
}

/// The entity categories an overwrite decision operates on.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Metadata,
    Sections,
    Tables,
    Images,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Metadata,
        EntityKind::Sections,
        EntityKind::Tables,
        EntityKind::Images,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Metadata => "metadata",
            EntityKind::Sections => "sections",
            EntityKind::Tables => "tables",
            EntityKind::Images => "images",
        }
    }

    fn bit(self) -> u8 {
        match self {
            EntityKind::Metadata => 1 << 0,
            EntityKind::Sections => 1 << 1,
            EntityKind::Tables => 1 << 2,
            EntityKind::Images => 1 << 3,
        }
    }
}

/// A set of [`EntityKind`]s selected for overwrite. Any combination can be
/// expressed; the interaction layer translates operator intent into this.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct OverwriteSet(u8);

impl OverwriteSet {
    pub fn empty() -> Self {
        OverwriteSet(0)
    }

    pub fn all() -> Self {
        let mut set = OverwriteSet::empty();
        for kind in EntityKind::ALL {
            set.insert(kind);
        }
        set
    }

    pub fn of(kinds: &[EntityKind]) -> Self {
        let mut set = OverwriteSet::empty();
        for kind in kinds {
            set.insert(*kind);
        }
        set
    }

    pub fn insert(&mut self, kind: EntityKind) {
        self.0 |= kind.bit();
    }

    pub fn contains(self, kind: EntityKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn labels(self) -> Vec<&'static str> {
        EntityKind::ALL
            .into_iter()
            .filter(|kind| self.contains(*kind))
            .map(EntityKind::as_str)
            .collect()
    }
}

/// Per-kind row counts written by one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestCounts {
    pub sections_saved: usize,
    pub tables_saved: usize,
    pub images_saved: usize,
    pub references_saved: usize,
}

/// Outcome of one ingestion run, as reported to the caller and serialized
/// into the run manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub paper_id: i64,
    pub title: String,
    pub decision: String,
    pub overwritten_kinds: Vec<String>,
    pub counts: IngestCounts,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub completed_at: String,
    pub paper_path: String,
    pub db_path: String,
    pub report: IngestReport,
}
