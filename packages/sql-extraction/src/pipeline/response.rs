//! Cleaning and parsing of raw model responses.

use crate::pipeline::prompts::REPORT_MARKER;
use crate::types::model::{ConsolidatedModel, ParserOutput};

const FENCE: &str = "```";

/// Remove markdown code fences and a leading `json` language tag.
///
/// A response wrapped in a fence is unwrapped. A response with prose around a
/// fenced block yields the first block. Anything else is only trimmed.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();

    let inner = match trimmed.find(FENCE) {
        Some(start) => {
            let after_open = &trimmed[start + FENCE.len()..];
            // The rest of the opening line is the language tag.
            let body = match after_open.find('\n') {
                Some(newline) if is_language_tag(&after_open[..newline]) => {
                    &after_open[newline + 1..]
                }
                _ => after_open,
            };
            match body.find(FENCE) {
                Some(end) => &body[..end],
                None => body,
            }
        }
        None => trimmed,
    };

    strip_json_tag(inner.trim())
}

/// Unwrap a report only when a fence encloses the whole text.
pub fn strip_outer_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.starts_with(FENCE) && trimmed.ends_with(FENCE) && trimmed.len() > 2 * FENCE.len() {
        let inner = &trimmed[FENCE.len()..trimmed.len() - FENCE.len()];
        return match inner.find('\n') {
            Some(newline) if is_language_tag(&inner[..newline]) => inner[newline + 1..].trim(),
            _ => inner.trim(),
        };
    }
    trimmed
}

fn is_language_tag(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn strip_json_tag(text: &str) -> &str {
    match text.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => {
            let rest = &text[4..];
            if rest.starts_with(|c: char| c.is_whitespace() || c == '{' || c == '[') {
                rest.trim_start()
            } else {
                text
            }
        }
        _ => text,
    }
}

/// Split a combined response into its JSON part and the markdown report.
///
/// Without the marker the whole text is the JSON part.
pub fn split_combined(text: &str) -> (&str, Option<&str>) {
    match text.split_once(REPORT_MARKER) {
        Some((json, report)) => {
            let report = strip_outer_fence(report);
            (json, (!report.is_empty()).then_some(report))
        }
        None => (text, None),
    }
}

/// Parse an extraction response; the failure payload keeps the raw text.
pub fn parse_data_model(response: &str) -> ParserOutput {
    match ParserOutput::from_response_text(strip_code_fences(response)) {
        ParserOutput::Failed(mut failure) => {
            failure.response_text = response.to_string();
            ParserOutput::Failed(failure)
        }
        parsed => parsed,
    }
}

/// Parse a merge response.
pub fn parse_consolidated(response: &str) -> Result<ConsolidatedModel, serde_json::Error> {
    serde_json::from_str(strip_code_fences(response))
}
