use crate::config::DraftLimits;
use crate::error::DraftError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static OPEN_FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^```(?:json)?\s*").unwrap());
static CLOSE_FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*```$").unwrap());

/// Turns raw provider text into a JSON value: enforces the byte cap, drops a
/// surrounding markdown fence and parses what is left.
pub fn read_candidate(raw: &str, limits: &DraftLimits) -> Result<Value, DraftError> {
    let trimmed = raw.trim();
    if trimmed.len() > limits.max_response_bytes {
        return Err(DraftError::ResponseTooLarge {
            limit: limits.max_response_bytes,
            actual: trimmed.len(),
        });
    }

    let cleaned = strip_code_fence(trimmed);
    if cleaned.is_empty() {
        return Err(DraftError::EmptyCandidate);
    }
    Ok(serde_json::from_str(cleaned)?)
}

pub fn strip_code_fence(input: &str) -> &str {
    let mut out = input.trim();
    if let Some(m) = OPEN_FENCE_RE.find(out) {
        out = &out[m.end()..];
    }
    if let Some(m) = CLOSE_FENCE_RE.find(out) {
        out = &out[..m.start()];
    }
    out.trim()
}
