//! LLM judge seam and defensive response parsing
//!
//! Judges are an injected capability with a single prompt-to-text method so
//! tests can substitute deterministic stubs. Judge output is free text
//! expected to contain one JSON object; parsing extracts the first balanced
//! candidate and never panics on malformed output.

use async_trait::async_trait;
use serde_json::Value;

/// Errors from the judge service
#[derive(Debug, Clone, thiserror::Error)]
pub enum JudgeError {
    /// Service unreachable or returned a transport error
    #[error("judge unavailable: {0}")]
    Unavailable(String),

    /// The call exceeded its deadline
    #[error("judge call timed out")]
    Timeout,
}

/// Text-completion call against a judge model
#[async_trait]
pub trait Judge: Send + Sync {
    /// Complete `prompt`, returning free text expected to contain one JSON
    /// object
    ///
    /// # Errors
    /// Transport or timeout failures.
    async fn complete(&self, prompt: &str) -> Result<String, JudgeError>;
}

/// Extract and parse the first balanced JSON object or array in `text`
///
/// Scans for `{`/`[` openers, tracks string and escape state, and returns
/// the first candidate that parses. `None` when nothing parseable is found.
#[must_use]
pub fn extract_first_json(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    let mut start = 0;

    while let Some(offset) = text[start..].find(['{', '[']) {
        let open = start + offset;
        if let Some(end) = balanced_end(bytes, open) {
            if let Ok(value) = serde_json::from_str(&text[open..=end]) {
                return Some(value);
            }
        }
        start = open + 1;
    }

    None
}

/// Index of the byte closing the bracket opened at `open`, if balanced
fn balanced_end(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_plain_object() {
        let value = extract_first_json(r#"{"pass": true}"#).unwrap();
        assert_eq!(value, json!({"pass": true}));
    }

    #[test]
    fn extracts_object_from_prose() {
        let text = "Sure! Here is my verdict:\n```json\n{\"pass\": false, \"gaps\": [\"x\"]}\n```\nHope that helps.";
        let value = extract_first_json(text).unwrap();
        assert_eq!(value["gaps"][0], "x");
    }

    #[test]
    fn extracts_array() {
        let value = extract_first_json("scores: [1, 2, 3] done").unwrap();
        assert_eq!(value, json!([1, 2, 3]));
    }

    #[test]
    fn handles_braces_inside_strings() {
        let text = r#"{"critique": "odd chars } ] \" here", "pass": true}"#;
        let value = extract_first_json(text).unwrap();
        assert_eq!(value["pass"], true);
    }

    #[test]
    fn skips_unparseable_candidates() {
        let text = "{not json at all} but later {\"ok\": 1}";
        let value = extract_first_json(text).unwrap();
        assert_eq!(value, json!({"ok": 1}));
    }

    #[test]
    fn none_on_garbage() {
        assert!(extract_first_json("no structured data here").is_none());
        assert!(extract_first_json("{truncated").is_none());
        assert!(extract_first_json("").is_none());
    }

    #[test]
    fn nested_objects_balance() {
        let text = "prefix {\"a\": {\"b\": [1, {\"c\": 2}]}} suffix";
        let value = extract_first_json(text).unwrap();
        assert_eq!(value["a"]["b"][1]["c"], 2);
    }
}
