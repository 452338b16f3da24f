use std::collections::HashSet;
use std::time::Duration;

use super::ExtractResult;

#[derive(Debug, Clone, Default)]
pub struct SectionAnalysis {
    pub summary: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TableAnalysis {
    pub title: String,
    pub summary: String,
    pub context_analysis: String,
    pub statistical_findings: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ImageAnalysis {
    pub summary: String,
    pub graphic_analysis: String,
    pub statistical_analysis: String,
    pub contextual_relevance: String,
    pub keywords: Vec<String>,
}

/// Interpretive analysis backend for extracted artifacts.
///
/// Implementations must complete each call within `budget` and report an
/// elapsed budget as a failure; the gateway degrades a failed analysis to
/// empty fields rather than dropping the artifact.
pub trait Analyzer {
    fn analyze_section(
        &self,
        title: &str,
        content: &str,
        budget: Duration,
    ) -> ExtractResult<SectionAnalysis>;

    fn analyze_table(
        &self,
        raw_content: &str,
        table_number: u32,
        budget: Duration,
    ) -> ExtractResult<TableAnalysis>;

    fn analyze_image(
        &self,
        alt_text: &str,
        image_number: u32,
        budget: Duration,
    ) -> ExtractResult<ImageAnalysis>;
}

/// Deterministic offline analyzer. Summaries are leading sentences of the
/// source text; keywords are the most salient distinct words. Useful when
/// no analysis service is reachable and as the test backend.
#[derive(Debug, Default)]
pub struct HeuristicAnalyzer;

impl Analyzer for HeuristicAnalyzer {
    fn analyze_section(
        &self,
        title: &str,
        content: &str,
        _budget: Duration,
    ) -> ExtractResult<SectionAnalysis> {
        Ok(SectionAnalysis {
            summary: leading_sentences(content, 2),
            keywords: salient_words(&format!("{title} {content}"), 10),
        })
    }

    fn analyze_table(
        &self,
        raw_content: &str,
        table_number: u32,
        _budget: Duration,
    ) -> ExtractResult<TableAnalysis> {
        let header = raw_content.lines().next().unwrap_or("");
        let title = match first_header_cell(header) {
            Some(cell) => format!("Table {table_number}: {cell}"),
            None => format!("Table {table_number}"),
        };

        Ok(TableAnalysis {
            title,
            summary: format!("Tabular data headed by: {}", header.trim()),
            context_analysis: String::new(),
            statistical_findings: String::new(),
            keywords: salient_words(raw_content, 10),
        })
    }

    fn analyze_image(
        &self,
        alt_text: &str,
        image_number: u32,
        _budget: Duration,
    ) -> ExtractResult<ImageAnalysis> {
        let summary = if alt_text.is_empty() {
            format!("Figure {image_number}")
        } else {
            alt_text.to_string()
        };

        Ok(ImageAnalysis {
            summary,
            graphic_analysis: String::new(),
            statistical_analysis: String::new(),
            contextual_relevance: String::new(),
            keywords: salient_words(alt_text, 10),
        })
    }
}

fn leading_sentences(text: &str, count: usize) -> String {
    let mut taken = 0;
    let mut end = 0;

    for (idx, ch) in text.char_indices() {
        if ch == '.' || ch == '!' || ch == '?' {
            taken += 1;
            end = idx + ch.len_utf8();
            if taken == count {
                break;
            }
        }
    }

    let summary = if taken > 0 { &text[..end] } else { text };
    summary.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn salient_words(text: &str, limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut words = Vec::new();

    for raw in text.split_whitespace() {
        let word: String = raw
            .chars()
            .filter(|ch| ch.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();

        if word.chars().count() < 6 {
            continue;
        }
        if seen.insert(word.clone()) {
            words.push(word);
            if words.len() == limit {
                break;
            }
        }
    }

    words
}

fn first_header_cell(header: &str) -> Option<String> {
    header
        .split('|')
        .map(str::trim)
        .find(|cell| !cell.is_empty())
        .map(ToOwned::to_owned)
}
