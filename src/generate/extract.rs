// src/generate/extract.rs
//! Two-stage JSON recovery for model output.
//!
//! Models are told to answer with raw JSON but regularly wrap it in prose or
//! ```json fences. Stage one parses the whole text; stage two parses the first
//! balanced `{...}` block found in it.

use serde_json::Value;

use crate::error::GenerateError;

/// Stage one: the trimmed text must be a JSON document on its own.
pub fn parse_strict(text: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(text.trim())
}

/// Stage two helper: first balanced `{...}` substring, if any.
///
/// Braces inside JSON string literals (including escaped quotes) do not count.
/// An unterminated block yields `None`.
pub fn extract_braced(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Strict parse first, then the braced block. When both fail the error of the
/// strict attempt is reported, since that is the one describing the whole text.
pub fn parse_payload(text: &str) -> Result<Value, GenerateError> {
    let strict_err = match parse_strict(text) {
        Ok(v) => return Ok(v),
        Err(e) => e,
    };

    match extract_braced(text) {
        Some(block) => serde_json::from_str(block).map_err(GenerateError::MalformedJson),
        None => Err(GenerateError::MalformedJson(strict_err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_accepts_plain_json_with_whitespace() {
        let v = parse_strict("  \n{\"stories\": []}\n").unwrap();
        assert!(v["stories"].is_array());
    }

    #[test]
    fn braced_skips_prose_and_code_fences() {
        let text = "Sure! Here is today's digest:\n```json\n{\"stories\":[{\"headline\":\"A\"}]}\n```\nHope it helps.";
        assert_eq!(
            extract_braced(text),
            Some("{\"stories\":[{\"headline\":\"A\"}]}")
        );
    }

    #[test]
    fn braced_ignores_braces_inside_strings() {
        let text = r#"prefix {"headline":"Rally {continues} \"}\" today","n":1} trailing }"#;
        let block = extract_braced(text).unwrap();
        let v: Value = serde_json::from_str(block).unwrap();
        assert_eq!(v["n"], 1);
        assert_eq!(v["headline"], "Rally {continues} \"}\" today");
    }

    #[test]
    fn braced_returns_first_block_only() {
        assert_eq!(extract_braced("{\"a\":1} and {\"b\":2}"), Some("{\"a\":1}"));
    }

    #[test]
    fn braced_none_when_missing_or_unterminated() {
        assert_eq!(extract_braced("no json here"), None);
        assert_eq!(extract_braced("{\"a\": {\"b\": 1}"), None);
    }

    #[test]
    fn payload_falls_back_to_braced_block() {
        let v = parse_payload("Here you go: {\"stories\": []} cheers").unwrap();
        assert!(v["stories"].is_array());
    }

    #[test]
    fn payload_without_braces_is_malformed() {
        let err = parse_payload("The news today is quiet.").unwrap_err();
        assert!(matches!(err, GenerateError::MalformedJson(_)));
    }

    #[test]
    fn payload_with_broken_block_is_malformed() {
        let err = parse_payload("text {\"stories\": [1,,2]} text").unwrap_err();
        assert!(matches!(err, GenerateError::MalformedJson(_)));
    }
}
