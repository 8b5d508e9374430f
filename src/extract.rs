//! Structured-Output Extraction
//!
//! Recovers a JSON object from free-form model text. Models wrap JSON in
//! prose or markdown code fences, so extraction tolerates surrounding noise:
//!
//! 1. Strip code fences and BOM, then try a direct parse
//! 2. Slice from the first `{` to the last `}` and parse that
//! 3. Balanced-scan for the first complete object embedded in mixed content
//!
//! Pipeline stages that must not fail on one bad reply use
//! [`extract_typed_with_reprompt`], which re-asks the model a bounded number
//! of times before giving up with `MalformedOutput`.

use std::future::Future;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::constants::extraction;
use crate::types::{LensError, Result};

/// Extract and parse a JSON object from an LLM reply
pub fn extract_json(content: &str) -> Result<Value> {
    let cleaned = preprocess(content);

    // Direct parse covers well-behaved replies
    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        return Ok(value);
    }

    // First-brace/last-brace slice tolerates prose around a single object
    if let Some(sliced) = brace_slice(&cleaned)
        && let Ok(value) = serde_json::from_str::<Value>(sliced)
    {
        debug!("JSON recovered via brace slice");
        return Ok(value);
    }

    // Balanced scan handles stray braces in the surrounding prose
    if let Some(extracted) = balanced_extract(&cleaned)
        && let Ok(value) = serde_json::from_str::<Value>(&extracted)
    {
        warn!("JSON recovered via balanced scan");
        return Ok(value);
    }

    Err(LensError::MalformedOutput(format!(
        "no JSON object found in model output. Preview: {}...",
        cleaned
            .chars()
            .take(extraction::ERROR_PREVIEW_CHARS)
            .collect::<String>()
    )))
}

/// Extract a JSON object and deserialize it into `T`
pub fn extract_typed<T: DeserializeOwned>(content: &str) -> Result<T> {
    let value = extract_json(content)?;
    serde_json::from_value(value)
        .map_err(|e| LensError::MalformedOutput(format!("JSON shape mismatch: {}", e)))
}

/// Extract typed output, re-asking the model on failure.
///
/// `reprompt` receives the extraction error message and must return a fresh
/// reply (typically a tool-free model call asking for valid JSON only).
/// At most [`extraction::MAX_REPROMPTS`] re-asks are made.
pub async fn extract_typed_with_reprompt<T, F, Fut>(content: &str, reprompt: F) -> Result<T>
where
    T: DeserializeOwned,
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<String>>,
{
    let mut last_err = match extract_typed::<T>(content) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    for attempt in 1..=extraction::MAX_REPROMPTS {
        warn!("Extraction failed ({}), reprompting (attempt {})", last_err, attempt);

        let retry_content = reprompt(last_err.to_string()).await?;
        match extract_typed::<T>(&retry_content) {
            Ok(value) => {
                debug!("Extraction succeeded on reprompt attempt {}", attempt);
                return Ok(value);
            }
            Err(e) => last_err = e,
        }
    }

    Err(last_err)
}

// =============================================================================
// Internal
// =============================================================================

/// Strip markdown fences, BOM, and surrounding whitespace
fn preprocess(raw: &str) -> String {
    let mut s = raw.trim();
    s = s.trim_start_matches('\u{feff}').trim();

    let mut owned = s.to_string();
    if owned.starts_with("```")
        && let Some(first_newline) = owned.find('\n')
    {
        owned = owned[first_newline + 1..].to_string();
    }
    if owned.ends_with("```") {
        owned = owned[..owned.len() - 3].trim_end().to_string();
    }

    owned.trim().to_string()
}

/// Slice from the first `{` to the last `}`, if both exist
fn brace_slice(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let end = s.rfind('}')?;
    (end > start).then(|| &s[start..=end])
}

/// Scan for the first balanced JSON object, ignoring braces inside strings
fn balanced_extract(s: &str) -> Option<String> {
    let start = s.find('{')?;

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;

    for (i, ch) in s[start..].char_indices() {
        if escape {
            escape = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(s[start..start + i + ch.len_utf8()].to_string());
                }
            }
            _ => {}
        }
    }

    None
}
