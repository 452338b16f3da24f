//! Extraction gateway: turns raw paper markup into typed records.
//!
//! The structural discovery (headings, pipe-grid tables, inline images,
//! reference lists) is pattern-based and lives here. The interpretive
//! analysis fields (summaries, keywords, context analysis) go through the
//! [`Analyzer`] seam so the backing service can be swapped; the bundled
//! [`HeuristicAnalyzer`] produces deterministic offline analysis.

use std::time::Duration;

use regex::Regex;
use thiserror::Error;

use crate::config::AnalyzerConfig;
use crate::ident::IdentityError;
use crate::model::{ImageRecord, PaperRecord, ReferenceList, SectionRecord, TableRecord};

mod analysis;
mod images;
mod metadata;
mod references;
mod sections;
mod tables;

pub use analysis::{
    Analyzer, HeuristicAnalyzer, ImageAnalysis, SectionAnalysis, TableAnalysis,
};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("metadata incomplete: {0}")]
    MetadataIncomplete(String),

    #[error("analysis failed: {0}")]
    Analysis(String),

    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

pub type ExtractResult<T> = Result<T, ExtractError>;

/// Contract the ingestion pipeline consumes. Calls are synchronous, free
/// of storage side effects, and may fail; empty results are not errors.
pub trait Extractor {
    fn extract_metadata(&self, content: &str, source_file: &str) -> ExtractResult<PaperRecord>;
    fn extract_sections(&self, content: &str, paper_id: i64) -> ExtractResult<Vec<SectionRecord>>;
    fn extract_tables(&self, content: &str, paper_id: i64) -> ExtractResult<Vec<TableRecord>>;
    fn extract_images(&self, content: &str, paper_id: i64) -> ExtractResult<Vec<ImageRecord>>;
    fn extract_references(
        &self,
        content: &str,
        paper_id: i64,
    ) -> ExtractResult<Option<ReferenceList>>;
}

/// Pattern-based extractor for markdown papers with embedded pipe-grid
/// tables and inline base64 images.
pub struct MarkdownExtractor {
    analyzer: Box<dyn Analyzer>,
    analysis_budget: Duration,
    heading_regex: Regex,
    table_regex: Regex,
    image_regex: Regex,
    doi_regex: Regex,
    reference_entry_regex: Regex,
}

impl MarkdownExtractor {
    pub fn new(config: &AnalyzerConfig, analyzer: Box<dyn Analyzer>) -> ExtractResult<Self> {
        Ok(MarkdownExtractor {
            analyzer,
            analysis_budget: config.timeout,
            heading_regex: Regex::new(r"(?m)^(#{1,6})\s+(.+)$")?,
            table_regex: Regex::new(r"(\|[^\n]+\|\n\|[-|\s:]+\|\n(?:\|[^\n]+\|\n?)*)")?,
            image_regex: Regex::new(r"!\[([^\]]*)\]\(data:image/([^;]+);base64,([\s\S]+?)\)")?,
            doi_regex: Regex::new(r"(?i)\bdoi:?\s*(?:https?://doi\.org/)?(10\.[\d.]+/\S+)")?,
            reference_entry_regex: Regex::new(r"^\s*\[?(\d+)[.\])]\s+(.+)$")?,
        })
    }
}

impl Extractor for MarkdownExtractor {
    fn extract_metadata(&self, content: &str, source_file: &str) -> ExtractResult<PaperRecord> {
        metadata::extract(content, source_file, &self.doi_regex, &self.heading_regex)
    }

    fn extract_sections(&self, content: &str, paper_id: i64) -> ExtractResult<Vec<SectionRecord>> {
        sections::extract(
            content,
            paper_id,
            &self.heading_regex,
            self.analyzer.as_ref(),
            self.analysis_budget,
        )
    }

    fn extract_tables(&self, content: &str, paper_id: i64) -> ExtractResult<Vec<TableRecord>> {
        tables::extract(
            content,
            paper_id,
            &self.table_regex,
            self.analyzer.as_ref(),
            self.analysis_budget,
        )
    }

    fn extract_images(&self, content: &str, paper_id: i64) -> ExtractResult<Vec<ImageRecord>> {
        images::extract(
            content,
            paper_id,
            &self.image_regex,
            self.analyzer.as_ref(),
            self.analysis_budget,
        )
    }

    fn extract_references(
        &self,
        content: &str,
        paper_id: i64,
    ) -> ExtractResult<Option<ReferenceList>> {
        references::extract(
            content,
            paper_id,
            &self.heading_regex,
            &self.reference_entry_regex,
        )
    }
}
