//! Bounded prompt assembly for one failure bucket.
//!
//! Every rendering here is size-capped: file contents are truncated to a
//! head plus a short tail, and at most three error-pattern hints are
//! included, so one bucket never produces an unbounded prompt.

use std::collections::BTreeMap;

use crate::report::FailureRecord;

use super::RevisionBucket;

/// System message sent with every revision request.
pub const REVISION_SYSTEM_PROMPT: &str = "You are an expert software engineer specializing in \
debugging and fixing code issues. You analyze test failures and provide precise, working code fixes.";

/// Maximum error-pattern hints included in one prompt.
const MAX_ERROR_PATTERNS: usize = 3;

/// Truncate file content to roughly `max_lines`: the first half is kept,
/// then a marker, then the last quarter.
pub fn truncate_content(content: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    if lines.len() <= max_lines {
        return content.to_string();
    }

    let head = &lines[..max_lines / 2];
    let tail = &lines[lines.len() - max_lines / 4..];

    let mut out: Vec<&str> = Vec::with_capacity(head.len() + tail.len() + 1);
    out.extend_from_slice(head);
    out.push("\n... (content truncated) ...\n");
    out.extend_from_slice(tail);
    out.join("\n")
}

/// Select and truncate the code-context files relevant to one bucket.
pub fn relevant_files_for_bucket(
    bucket: RevisionBucket,
    code_context: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut relevant = BTreeMap::new();

    let (keep, cap): (fn(&str) -> bool, usize) = match bucket {
        RevisionBucket::FileUpload => (|p| p.contains("index.html") || p.contains("app.py"), 150),
        RevisionBucket::GithubIntegration => (|p| p.contains("app.py") || p.contains(".env"), 100),
        RevisionBucket::UiInteraction => (
            |p| p.contains("index.html") || p.contains(".js") || p.contains(".css"),
            150,
        ),
        RevisionBucket::ApiAuthentication => (|p| p.contains("app.py") || p.contains(".env"), 100),
        RevisionBucket::FormValidation => (|p| p.contains("index.html") || p.contains(".js"), 150),
        RevisionBucket::General => (|_| true, 100),
    };

    for (path, content) in code_context {
        if keep(path) {
            relevant.insert(path.clone(), truncate_content(content, cap));
        }
    }

    relevant
}

/// Build the user prompt for one bucket: failure summary, relevant code,
/// up to three error-pattern hints, and the required JSON reply shape.
pub fn build_revision_prompt(
    bucket: RevisionBucket,
    failures: &[&FailureRecord],
    code_context: &BTreeMap<String, String>,
    error_patterns: &[String],
) -> String {
    let failure_summary = failures
        .iter()
        .map(|f| format!("Test {}: {}", f.test_id, f.error_message))
        .collect::<Vec<_>>()
        .join("\n");

    let relevant = relevant_files_for_bucket(bucket, code_context);
    let code_sections = relevant
        .iter()
        .map(|(path, content)| format!("=== {path} ===\n{content}"))
        .collect::<Vec<_>>()
        .join("\n\n");

    let hints = error_patterns
        .iter()
        .take(MAX_ERROR_PATTERNS)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "\nFailing tests ({bucket_name}):\n{failure_summary}\n\n\
Code:\n{code_sections}\n\n\
Errors: {hints}\n\n\
Provide JSON fix:\n\
{{\n\
    \"file_path\": \"path/to/file\",\n\
    \"original_code\": \"code to change\",\n\
    \"revised_code\": \"fixed code\",\n\
    \"explanation\": \"what was wrong and how fix addresses it\",\n\
    \"confidence_score\": 0.95,\n\
    \"addresses_test_ids\": [\"TC001\"],\n\
    \"change_type\": \"fix\"\n\
}}\n\n\
Only JSON response.\n",
        bucket_name = bucket.as_str(),
    )
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

    #[test]
    fn test_truncate_keeps_short_content() {
        let content = "a\nb\nc";
        assert_eq!(truncate_content(content, 10), content);
    }

    #[test]
    fn test_truncate_keeps_head_and_tail() {
        let content = (0..200).map(|i| format!("line{i}")).collect::<Vec<_>>().join("\n");
        let truncated = truncate_content(&content, 100);
        assert!(truncated.contains("line0"));
        assert!(truncated.contains("line49"));
        assert!(!truncated.contains("line100\n"));
        assert!(truncated.contains("line199"));
        assert!(truncated.contains("content truncated"));
    }

    #[test]
    fn test_relevant_files_filtered_per_bucket() {
        let mut context = BTreeMap::new();
        context.insert("frontend/templates/index.html".to_string(), "<html>".to_string());
        context.insert("app.py".to_string(), "import flask".to_string());
        context.insert(".env.example".to_string(), "KEY=".to_string());

        let github = relevant_files_for_bucket(RevisionBucket::GithubIntegration, &context);
        assert!(github.contains_key("app.py"));
        assert!(github.contains_key(".env.example"));
        assert!(!github.contains_key("frontend/templates/index.html"));

        let general = relevant_files_for_bucket(RevisionBucket::General, &context);
        assert_eq!(general.len(), 3);
    }

    #[test]
    fn test_prompt_contains_sections_and_caps_hints() {
        let f1 = failure("TC1", "file upload broken");
        let failures = vec![&f1];
        let mut context = BTreeMap::new();
        context.insert("app.py".to_string(), "def upload(): pass".to_string());
        let patterns: Vec<String> = (0..5).map(|i| format!("pattern-{i}")).collect();

        let prompt = build_revision_prompt(
            RevisionBucket::FileUpload,
            &failures,
            &context,
            &patterns,
        );

        assert!(prompt.contains("Failing tests (file_upload):"));
        assert!(prompt.contains("Test TC1: file upload broken"));
        assert!(prompt.contains("=== app.py ==="));
        assert!(prompt.contains("pattern-2"));
        assert!(!prompt.contains("pattern-3"));
        assert!(prompt.contains("Only JSON response."));
    }
}
