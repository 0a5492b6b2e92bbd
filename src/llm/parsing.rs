//! Cleanup of raw model text before JSON parsing.
//!
//! Even in JSON response mode a model occasionally wraps its object in a
//! code fence or pads it with prose. Scrub to the outermost brace window
//! before handing the text to serde.

use serde_json::Value;

/// Strip code-fence markers and anything outside the outermost `{...}`.
pub fn clean_json_text(text: &str) -> String {
    let mut cleaned = text.replace("```json", "").replace("```", "");
    cleaned = cleaned.trim().to_string();

    if let Some(start) = cleaned.find('{') {
        if start > 0 {
            cleaned = cleaned[start..].to_string();
        }
    }
    if let Some(end) = cleaned.rfind('}') {
        if end + 1 < cleaned.len() {
            cleaned.truncate(end + 1);
        }
    }

    cleaned.trim().to_string()
}

/// Clean then parse. `None` means the text holds no parseable JSON value.
pub fn parse_json_safely(text: &str) -> Option<Value> {
    let cleaned = clean_json_text(text);
    if cleaned.is_empty() {
        return None;
    }
    match serde_json::from_str(&cleaned) {
        Ok(value) => Some(value),
        Err(e) => {
            log::debug!(
                "JSON parse error: {} (cleaned text starts: {:.200})",
                e,
                cleaned
            );
            None
        }
    }
}
