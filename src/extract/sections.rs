use std::time::Duration;

use chrono::Utc;
use regex::Regex;
use tracing::warn;

use crate::ident;
use crate::model::SectionRecord;

use super::analysis::Analyzer;
use super::ExtractResult;

/// Splits the document into sections at ATX headings. Section numbers are
/// contiguous from 1 in document order; text before the first heading is
/// the bibliographic header and is not a section.
pub fn extract(
    content: &str,
    paper_id: i64,
    heading_regex: &Regex,
    analyzer: &dyn Analyzer,
    budget: Duration,
) -> ExtractResult<Vec<SectionRecord>> {
    let headings: Vec<_> = heading_regex.captures_iter(content).collect();
    let mut records = Vec::with_capacity(headings.len());

    for (index, captures) in headings.iter().enumerate() {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        let level = captures[1].len() as u32;
        let title = captures[2].trim().to_string();

        let body_start = whole.end();
        let body_end = headings
            .get(index + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(content.len());
        let body = content[body_start..body_end].trim().to_string();

        let section_number = (records.len() + 1) as u32;
        let analysis = analyzer
            .analyze_section(&title, &body, budget)
            .unwrap_or_else(|err| {
                warn!(section = section_number, error = %err, "section analysis degraded");
                Default::default()
            });

        let seed = format!(
            "section_{section_number}:{title}:{}",
            ident::char_prefix(&body, 500)
        );

        records.push(SectionRecord {
            id: ident::content_id(&seed, &format!("section_{section_number}")),
            paper_id,
            title,
            word_count: body.split_whitespace().count() as u32,
            content: body,
            summary: analysis.summary,
            keywords: analysis.keywords,
            section_number,
            level,
            extracted_at: Utc::now(),
        });
    }

    Ok(records)
}
