//! Defensive parsing of model replies into patch suggestions.
//!
//! The model may wrap JSON in code fences or pad it with prose; parsing is
//! two-stage — direct JSON first, then a substring carve between the first
//! `{` and the last `}`.

use serde_json::Value;

use crate::error::AppError;
use crate::report::FailureRecord;

use super::types::{ChangeKind, PatchSuggestion};

/// Default confidence when the model omits a score.
const DEFAULT_CONFIDENCE: f64 = 0.8;

/// Strip a leading/trailing code-fence marker if present.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the fence line itself (it may carry a language tag).
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}

/// Two-stage JSON extraction: direct parse, then brace carving.
pub fn extract_json(text: &str) -> Result<Value, AppError> {
    let cleaned = strip_code_fences(text);

    if let Ok(value) = serde_json::from_str::<Value>(cleaned) {
        return Ok(value);
    }

    let start = cleaned.find('{');
    let end = cleaned.rfind('}');
    if let (Some(start), Some(end)) = (start, end) {
        if end > start {
            if let Ok(value) = serde_json::from_str::<Value>(&cleaned[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(AppError::ModelResponse(format!(
        "no JSON object found in reply: {}",
        preview(cleaned)
    )))
}

/// Parse one model reply into a `PatchSuggestion`.
///
/// Required keys: `file_path`, `original_code`/`original_text`,
/// `revised_code`/`revised_text`, `explanation`. Missing optional fields
/// take their documented defaults; `addresses_test_ids` defaults to every
/// test id in the bucket.
pub fn parse_suggestion(
    reply: &str,
    bucket_failures: &[&FailureRecord],
) -> Result<PatchSuggestion, AppError> {
    let value = extract_json(reply)?;

    let file_path = require_str(&value, &["file_path"])?;
    let original_text = require_str(&value, &["original_code", "original_text"])?;
    let revised_text = require_str(&value, &["revised_code", "revised_text"])?;
    let explanation = require_str(&value, &["explanation"])?;

    let confidence = value
        .get("confidence_score")
        .and_then(|v| v.as_f64())
        .unwrap_or(DEFAULT_CONFIDENCE)
        .clamp(0.0, 1.0);

    let change_kind = value
        .get("change_type")
        .and_then(|v| v.as_str())
        .map(ChangeKind::parse)
        .unwrap_or(ChangeKind::Fix);

    let addressed_test_ids = value
        .get("addresses_test_ids")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|item| item.as_str().map(String::from))
                .collect::<Vec<_>>()
        })
        .filter(|ids| !ids.is_empty())
        .unwrap_or_else(|| bucket_failures.iter().map(|f| f.test_id.clone()).collect());

    Ok(PatchSuggestion {
        file_path,
        original_text,
        revised_text,
        explanation,
        confidence,
        addressed_test_ids,
        change_kind,
        diff: None,
    })
}

fn require_str(value: &Value, keys: &[&str]) -> Result<String, AppError> {
    for key in keys {
        if let Some(s) = value.get(key).and_then(|v| v.as_str()) {
            return Ok(s.to_string());
        }
    }
    Err(AppError::ModelResponse(format!(
        "missing required key {:?} in reply",
        keys[0]
    )))
}

fn preview(text: &str) -> &str {
    let max = 120;
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{categorize_failure, suggested_fixes};

    fn failure(id: &str, error: &str) -> FailureRecord {
        let category = categorize_failure(error, "", "");
        FailureRecord {
            test_id: id.to_string(),
            title: String::new(),
            description: String::new(),
            error_message: error.to_string(),
            category,
            code_snippet: None,
            visualization_url: None,
            suggested_fixes: suggested_fixes(category),
        }
    }

    const FULL_REPLY: &str = r#"{
        "file_path": "app.py",
        "original_code": "x = 1",
        "revised_code": "x = 2",
        "explanation": "off by one",
        "confidence_score": 0.95,
        "addresses_test_ids": ["TC7"],
        "change_type": "refactor"
    }"#;

    #[test]
    fn test_parse_full_reply() {
        let f = failure("TC1", "e");
        let suggestion = parse_suggestion(FULL_REPLY, &[&f]).unwrap();
        assert_eq!(suggestion.file_path, "app.py");
        assert_eq!(suggestion.original_text, "x = 1");
        assert_eq!(suggestion.revised_text, "x = 2");
        assert_eq!(suggestion.confidence, 0.95);
        assert_eq!(suggestion.addressed_test_ids, vec!["TC7".to_string()]);
        assert_eq!(suggestion.change_kind, crate::revision::ChangeKind::Refactor);
        assert!(suggestion.diff.is_none());
    }

    #[test]
    fn test_defaults_applied_when_fields_missing() {
        let reply = r#"{"file_path":"a.txt","original_text":"foo","revised_text":"bar","explanation":"swap"}"#;
        let f1 = failure("TC1", "e");
        let f2 = failure("TC2", "e");
        let suggestion = parse_suggestion(reply, &[&f1, &f2]).unwrap();
        assert_eq!(suggestion.confidence, 0.8);
        assert_eq!(suggestion.change_kind, crate::revision::ChangeKind::Fix);
        assert_eq!(
            suggestion.addressed_test_ids,
            vec!["TC1".to_string(), "TC2".to_string()]
        );
    }

    #[test]
    fn test_fenced_reply_is_unwrapped() {
        let reply = format!("```json\n{FULL_REPLY}\n```");
        let f = failure("TC1", "e");
        let suggestion = parse_suggestion(&reply, &[&f]).unwrap();
        assert_eq!(suggestion.file_path, "app.py");
    }

    #[test]
    fn test_prose_padding_is_carved() {
        let reply = format!("Here is the fix you asked for:\n{FULL_REPLY}\nLet me know!");
        let f = failure("TC1", "e");
        let suggestion = parse_suggestion(&reply, &[&f]).unwrap();
        assert_eq!(suggestion.explanation, "off by one");
    }

    #[test]
    fn test_missing_required_key_is_rejected() {
        let reply = r#"{"file_path":"a.txt","original_code":"foo","explanation":"no revision"}"#;
        let f = failure("TC1", "e");
        let err = parse_suggestion(reply, &[&f]).unwrap_err();
        assert_eq!(err.kind(), "model_response");
    }

    #[test]
    fn test_non_json_is_rejected() {
        let f = failure("TC1", "e");
        let err = parse_suggestion("I could not produce a fix.", &[&f]).unwrap_err();
        assert_eq!(err.kind(), "model_response");
    }

    #[test]
    fn test_confidence_is_clamped() {
        let reply = r#"{"file_path":"a","original_code":"b","revised_code":"c","explanation":"d","confidence_score":1.7}"#;
        let f = failure("TC1", "e");
        let suggestion = parse_suggestion(reply, &[&f]).unwrap();
        assert_eq!(suggestion.confidence, 1.0);
    }
}
