//! Parsing of LLM fix responses
//!
//! Models wrap JSON in prose or markdown fences more often than not, so the
//! parser extracts the first JSON object before deserializing and then
//! validates the result.

use crate::remedy::types::FixResponse;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Invalid edit at index {index}: {reason}")]
    InvalidEdit { index: usize, reason: String },
}

/// Parses the raw LLM output into a validated [`FixResponse`].
pub fn parse_fix_response(response: &str) -> Result<FixResponse, ParseError> {
    debug!("Parsing fix response ({} chars)", response.len());

    let json_str = extract_json_from_response(response)?;

    let parsed: FixResponse = serde_json::from_str(&json_str).map_err(|e| {
        warn!("JSON parse error: {}", e);
        ParseError::InvalidJson(format!(
            "{}: {}",
            e,
            json_str.chars().take(100).collect::<String>()
        ))
    })?;

    validate_fix_response(&parsed)?;
    Ok(parsed)
}

/// Pulls a JSON object out of raw model output, tolerating markdown fences
/// and surrounding prose.
pub fn extract_json_from_response(response: &str) -> Result<String, ParseError> {
    let trimmed = response.trim();

    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Ok(trimmed.to_string());
    }

    if trimmed.contains("```") {
        return extract_from_markdown_block(trimmed);
    }

    if let Some(start) = trimmed.find('{') {
        if let Some(end) = trimmed.rfind('}') {
            if start < end {
                return Ok(trimmed[start..=end].to_string());
            }
        }
    }

    Err(ParseError::InvalidJson(
        "No JSON object found in response".to_string(),
    ))
}

fn extract_from_markdown_block(text: &str) -> Result<String, ParseError> {
    let re = Regex::new(r"```(?:json)?\s*\n?([\s\S]*?)\n?```")
        .map_err(|e| ParseError::InvalidJson(e.to_string()))?;

    if let Some(captures) = re.captures(text) {
        if let Some(json_match) = captures.get(1) {
            let json = json_match.as_str().trim();
            if json.starts_with('{') && json.ends_with('}') {
                return Ok(json.to_string());
            }
        }
    }

    Err(ParseError::InvalidJson(
        "Could not extract JSON from markdown block".to_string(),
    ))
}

fn validate_fix_response(response: &FixResponse) -> Result<(), ParseError> {
    if response.rationale.trim().is_empty() {
        return Err(ParseError::MissingField("rationale".to_string()));
    }

    if response.fixable && response.edits.is_empty() {
        return Err(ParseError::MissingField(
            "edits (fixable response has none)".to_string(),
        ));
    }

    for (index, edit) in response.edits.iter().enumerate() {
        if edit.path.trim().is_empty() {
            return Err(ParseError::InvalidEdit {
                index,
                reason: "empty path".to_string(),
            });
        }
    }

    Ok(())
}
