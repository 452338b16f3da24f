use chrono::Utc;
use regex::Regex;

use crate::ident;
use crate::model::PaperRecord;

use super::{ExtractError, ExtractResult};

/// Builds the paper record from the document's bibliographic header
/// lines. A missing title is fatal; every other field is optional.
pub fn extract(
    content: &str,
    source_file: &str,
    doi_regex: &Regex,
    heading_regex: &Regex,
) -> ExtractResult<PaperRecord> {
    let title = labeled_value(content, "Title")
        .or_else(|| first_top_heading(content, heading_regex))
        .ok_or_else(|| {
            ExtractError::MetadataIncomplete(format!("no title found in {source_file}"))
        })?;

    let doi = doi_regex
        .captures(content)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';']).to_string());

    Ok(PaperRecord {
        id: ident::paper_id(content, source_file),
        title,
        authors: labeled_list(content, "Authors"),
        journal: labeled_value(content, "Journal"),
        publication_date: labeled_value(content, "Publication Date")
            .or_else(|| labeled_value(content, "Published"))
            .or_else(|| labeled_value(content, "Date")),
        doi,
        volume: labeled_value(content, "Volume"),
        issue: labeled_value(content, "Issue"),
        pages: labeled_value(content, "Pages"),
        abstract_text: abstract_block(content, heading_regex),
        keywords: labeled_list(content, "Keywords"),
        source_file: source_file.to_string(),
        extracted_at: Utc::now(),
        funding_sources: labeled_list(content, "Funding"),
        conflict_of_interest: labeled_value(content, "Conflict of Interest"),
        data_availability: labeled_value(content, "Data Availability"),
        ethics_approval: labeled_value(content, "Ethics Approval"),
        registration_number: labeled_value(content, "Registration Number")
            .or_else(|| labeled_value(content, "Registration")),
        supplemental_materials: labeled_list(content, "Supplemental Materials"),
    })
}

/// Value of a `Label: value` header line, matched case-insensitively.
fn labeled_value(content: &str, label: &str) -> Option<String> {
    let needle = format!("{}:", label.to_lowercase());

    for line in content.lines() {
        let trimmed = line.trim().trim_start_matches(['*', '_']);
        let Some(head) = trimmed.get(..needle.len()) else {
            continue;
        };
        if head.to_lowercase() == needle {
            let value = trimmed[needle.len()..].trim().trim_end_matches(['*', '_']);
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    None
}

fn labeled_list(content: &str, label: &str) -> Vec<String> {
    labeled_value(content, label)
        .map(|value| {
            value
                .split([',', ';'])
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(ToOwned::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

fn first_top_heading(content: &str, heading_regex: &Regex) -> Option<String> {
    heading_regex
        .captures_iter(content)
        .find(|captures| captures[1].len() == 1)
        .map(|captures| captures[2].trim().to_string())
}

/// Text under an `Abstract` heading (or after an `Abstract:` label line),
/// up to the next heading.
fn abstract_block(content: &str, heading_regex: &Regex) -> Option<String> {
    if let Some(inline) = labeled_value(content, "Abstract") {
        return Some(inline);
    }

    let abstract_heading = heading_regex
        .captures_iter(content)
        .find(|captures| captures[2].trim().eq_ignore_ascii_case("abstract"))?;
    let body_start = abstract_heading.get(0)?.end();

    let body = &content[body_start..];
    let body_end = heading_regex
        .find(body)
        .map(|next| next.start())
        .unwrap_or(body.len());

    let text = body[..body_end].trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
