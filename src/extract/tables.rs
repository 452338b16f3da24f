use std::time::Duration;

use chrono::Utc;
use regex::Regex;
use tracing::warn;

use crate::ident;
use crate::model::TableRecord;

use super::analysis::Analyzer;
use super::ExtractResult;

/// Discovers pipe-grid tables (header row, separator row, data rows) and
/// numbers them in document order.
pub fn extract(
    content: &str,
    paper_id: i64,
    table_regex: &Regex,
    analyzer: &dyn Analyzer,
    budget: Duration,
) -> ExtractResult<Vec<TableRecord>> {
    let mut records = Vec::new();

    for captures in table_regex.captures_iter(content) {
        let raw = captures[1].trim().to_string();
        if !has_meaningful_structure(&raw) {
            continue;
        }

        let table_number = (records.len() + 1) as u32;
        let analysis = analyzer
            .analyze_table(&raw, table_number, budget)
            .unwrap_or_else(|err| {
                warn!(table = table_number, error = %err, "table analysis degraded");
                Default::default()
            });

        let title = if analysis.title.is_empty() {
            format!("Table {table_number}")
        } else {
            analysis.title
        };

        let seed = format!(
            "table_{table_number}:{title}:{}",
            ident::char_prefix(&raw, 500)
        );

        records.push(TableRecord {
            id: ident::content_id(&seed, &format!("table_{table_number}")),
            paper_id,
            table_number,
            title,
            column_count: count_columns(&raw),
            row_count: count_rows(&raw),
            raw_content: raw,
            summary: analysis.summary,
            context_analysis: analysis.context_analysis,
            statistical_findings: analysis.statistical_findings,
            keywords: analysis.keywords,
            extracted_at: Utc::now(),
        });
    }

    Ok(records)
}

/// A grid only counts as a table with at least header, separator and one
/// data row, and enough pipes to carry more than a stray formatting line.
fn has_meaningful_structure(raw: &str) -> bool {
    raw.matches('\n').count() >= 2 && raw.matches('|').count() > 6
}

fn count_columns(raw: &str) -> u32 {
    let first_row = raw.lines().next().unwrap_or("");
    (first_row.matches('|').count().saturating_sub(1)) as u32
}

/// Data rows only: lines carrying cells, minus the header and separator.
fn count_rows(raw: &str) -> u32 {
    let cell_lines = raw
        .lines()
        .filter(|line| !line.trim().is_empty() && line.contains('|'))
        .count();
    cell_lines.saturating_sub(2) as u32
}
