use chrono::Utc;
use regex::Regex;

use crate::ident::{self, ElementType};
use crate::model::ReferenceList;

use super::ExtractResult;

/// Collects the numbered entries under a `References` heading, keeping
/// each entry verbatim (continuation lines joined). Absent heading or an
/// empty list yields `None`, which is not an error.
pub fn extract(
    content: &str,
    paper_id: i64,
    heading_regex: &Regex,
    entry_regex: &Regex,
) -> ExtractResult<Option<ReferenceList>> {
    let Some(heading) = heading_regex.captures_iter(content).find(|captures| {
        let title = captures[2].trim();
        title.eq_ignore_ascii_case("references") || title.eq_ignore_ascii_case("bibliography")
    }) else {
        return Ok(None);
    };

    let body_start = match heading.get(0) {
        Some(m) => m.end(),
        None => return Ok(None),
    };
    let body = &content[body_start..];
    let body_end = heading_regex
        .find(body)
        .map(|next| next.start())
        .unwrap_or(body.len());

    let mut references: Vec<String> = Vec::new();

    for line in body[..body_end].lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(captures) = entry_regex.captures(trimmed) {
            references.push(captures[2].trim().to_string());
        } else if let Some(current) = references.last_mut() {
            // Wrapped continuation of the previous entry.
            current.push(' ');
            current.push_str(trimmed);
        }
    }

    if references.is_empty() {
        return Ok(None);
    }

    let reference_count = references.len() as u32;

    Ok(Some(ReferenceList {
        id: ident::hierarchical_id(paper_id, ElementType::Reference, reference_count)?,
        paper_id,
        references,
        reference_count,
        extracted_at: Utc::now(),
    }))
}
