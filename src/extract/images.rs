use std::time::Duration;

use chrono::Utc;
use regex::Regex;
use tracing::warn;

use crate::ident;
use crate::model::ImageRecord;

use super::analysis::Analyzer;
use super::ExtractResult;

const SUPPORTED_FORMATS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "webp", "svg+xml"];

/// Discovers inline data-URI images (`![alt](data:image/<fmt>;base64,...)`)
/// and numbers them in document order. Payloads stay base64 encoded.
pub fn extract(
    content: &str,
    paper_id: i64,
    image_regex: &Regex,
    analyzer: &dyn Analyzer,
    budget: Duration,
) -> ExtractResult<Vec<ImageRecord>> {
    let mut records = Vec::new();

    for captures in image_regex.captures_iter(content) {
        let alt_text = captures[1].trim().to_string();
        let image_format = captures[2].to_lowercase();
        let payload: String = captures[3]
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .collect();

        if !SUPPORTED_FORMATS.contains(&image_format.as_str()) {
            warn!(format = %image_format, "skipping image with unsupported format");
            continue;
        }
        if !looks_like_base64(&payload) {
            warn!(alt = %alt_text, "skipping image with malformed base64 payload");
            continue;
        }

        let image_number = (records.len() + 1) as u32;
        let analysis = analyzer
            .analyze_image(&alt_text, image_number, budget)
            .unwrap_or_else(|err| {
                warn!(image = image_number, error = %err, "image analysis degraded");
                Default::default()
            });

        let seed = format!(
            "image_{image_number}:{alt_text}:{}",
            ident::char_prefix(&payload, 500)
        );

        records.push(ImageRecord {
            id: ident::content_id(&seed, &format!("image_{image_number}")),
            paper_id,
            image_number,
            alt_text,
            image_data: payload,
            image_format,
            summary: analysis.summary,
            graphic_analysis: analysis.graphic_analysis,
            statistical_analysis: analysis.statistical_analysis,
            contextual_relevance: analysis.contextual_relevance,
            keywords: analysis.keywords,
            extracted_at: Utc::now(),
        });
    }

    Ok(records)
}

fn looks_like_base64(payload: &str) -> bool {
    !payload.is_empty()
        && payload
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '+' || ch == '/' || ch == '=')
}
