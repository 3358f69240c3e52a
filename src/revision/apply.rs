//! Patch application: literal first-occurrence substitution with optional
//! backup, plus the human-readable revision report.
//!
//! Per-suggestion outcome is terminal: applied, rejected (no match), or
//! failed on IO. Errors for one file never abort the rest of the batch.

use std::collections::BTreeMap;
use std::path::Path;

use super::types::PatchSuggestion;

/// Apply each suggestion to its target file.
///
/// When `backup` is set and the target exists, the current content is
/// copied to `<path>.backup` (overwriting any prior backup) before the file
/// is touched. The first occurrence of `original_text` is replaced; an
/// absent substring or missing file records `false` without mutating
/// anything. There is no atomicity guarantee between backup and rewrite
/// beyond OS write semantics.
pub fn apply_suggestions(
    suggestions: &[PatchSuggestion],
    backup: bool,
) -> BTreeMap<String, bool> {
    let mut results = BTreeMap::new();

    for suggestion in suggestions {
        let success = apply_one(suggestion, backup);
        results.insert(suggestion.file_path.clone(), success);
    }

    results
}

fn apply_one(suggestion: &PatchSuggestion, backup: bool) -> bool {
    let path = Path::new(&suggestion.file_path);

    if !path.exists() {
        tracing::warn!(file = %suggestion.file_path, "Patch target does not exist");
        return false;
    }

    if backup {
        let backup_path = format!("{}.backup", suggestion.file_path);
        if let Err(e) = std::fs::copy(path, &backup_path) {
            tracing::warn!(file = %suggestion.file_path, error = %e, "Backup failed");
            return false;
        }
    }

    let current = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(file = %suggestion.file_path, error = %e, "Read failed");
            return false;
        }
    };

    if !current.contains(&suggestion.original_text) {
        tracing::warn!(
            file = %suggestion.file_path,
            "Original text not found; file may have changed since generation"
        );
        return false;
    }

    let updated = current.replacen(&suggestion.original_text, &suggestion.revised_text, 1);

    match std::fs::write(path, updated) {
        Ok(()) => {
            tracing::info!(
                file = %suggestion.file_path,
                explanation = %suggestion.explanation,
                "Applied revision"
            );
            true
        }
        Err(e) => {
            tracing::warn!(file = %suggestion.file_path, error = %e, "Write failed");
            false
        }
    }
}

/// Render the revision report: a summary block, then one section per
/// suggestion with status, change kind, confidence, addressed tests,
/// explanation, and fenced original/revised blocks. Purely presentational.
pub fn render_revision_report(
    suggestions: &[PatchSuggestion],
    results: &BTreeMap<String, bool>,
) -> String {
    let mut report = vec!["# AI Code Revision Report\n".to_string()];
    report.push(format!(
        "Generated: {}\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    ));

    let total = suggestions.len();
    let succeeded = results.values().filter(|ok| **ok).count();

    report.push("## Summary".to_string());
    report.push(format!("- Total revisions: {total}"));
    report.push(format!("- Successfully applied: {succeeded}"));
    report.push(format!("- Failed: {}", total - succeeded));
    report.push(String::new());

    for suggestion in suggestions {
        let applied = results.get(&suggestion.file_path).copied().unwrap_or(false);
        let status = if applied { "Applied" } else { "Failed" };

        report.push(format!("## {status}: {}", suggestion.file_path));
        report.push(format!("**Change Type:** {}", suggestion.change_kind.as_str()));
        report.push(format!("**Confidence:** {:.2}", suggestion.confidence));
        report.push(format!(
            "**Addresses Tests:** {}",
            suggestion.addressed_test_ids.join(", ")
        ));
        report.push(format!("**Explanation:** {}", suggestion.explanation));
        report.push(String::new());

        if !suggestion.original_text.is_empty() && !suggestion.revised_text.is_empty() {
            report.push("**Original Code:**".to_string());
            report.push(format!("```\n{}\n```", suggestion.original_text));
            report.push(String::new());
            report.push("**Revised Code:**".to_string());
            report.push(format!("```\n{}\n```", suggestion.revised_text));
            report.push(String::new());
        }
    }

    report.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revision::types::ChangeKind;
    use std::fs;

    fn suggestion(path: &str, original: &str, revised: &str) -> PatchSuggestion {
        PatchSuggestion {
            file_path: path.to_string(),
            original_text: original.to_string(),
            revised_text: revised.to_string(),
            explanation: "test change".to_string(),
            confidence: 0.8,
            addressed_test_ids: vec!["TC1".to_string()],
            change_kind: ChangeKind::Fix,
            diff: None,
        }
    }

    #[test]
    fn test_replaces_first_occurrence_only_with_backup() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a.txt");
        fs::write(&target, "foo foo").unwrap();

        let s = suggestion(target.to_str().unwrap(), "foo", "bar");
        let results = apply_suggestions(&[s], true);

        assert_eq!(results.get(target.to_str().unwrap()), Some(&true));
        assert_eq!(fs::read_to_string(&target).unwrap(), "bar foo");

        let backup = dir.path().join("a.txt.backup");
        assert_eq!(fs::read_to_string(backup).unwrap(), "foo foo");
    }

    #[test]
    fn test_absent_original_leaves_file_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a.txt");
        fs::write(&target, "stable content").unwrap();

        let s = suggestion(target.to_str().unwrap(), "missing snippet", "anything");
        let results = apply_suggestions(&[s], false);

        assert_eq!(results.get(target.to_str().unwrap()), Some(&false));
        assert_eq!(fs::read_to_string(&target).unwrap(), "stable content");
    }

    #[test]
    fn test_missing_file_records_failure() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("ghost.txt");

        let s = suggestion(target.to_str().unwrap(), "foo", "bar");
        let results = apply_suggestions(&[s], true);

        assert_eq!(results.get(target.to_str().unwrap()), Some(&false));
        assert!(!target.exists());
    }

    #[test]
    fn test_batch_continues_past_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.txt");
        fs::write(&good, "old text").unwrap();
        let bad = dir.path().join("bad.txt");

        let suggestions = vec![
            suggestion(bad.to_str().unwrap(), "x", "y"),
            suggestion(good.to_str().unwrap(), "old", "new"),
        ];
        let results = apply_suggestions(&suggestions, false);

        assert_eq!(results.get(bad.to_str().unwrap()), Some(&false));
        assert_eq!(results.get(good.to_str().unwrap()), Some(&true));
        assert_eq!(fs::read_to_string(&good).unwrap(), "new text");
    }

    #[test]
    fn test_backup_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a.txt");
        let backup = dir.path().join("a.txt.backup");
        fs::write(&target, "v1").unwrap();
        fs::write(&backup, "stale").unwrap();

        let s = suggestion(target.to_str().unwrap(), "v1", "v2");
        apply_suggestions(&[s], true);

        assert_eq!(fs::read_to_string(&backup).unwrap(), "v1");
        assert_eq!(fs::read_to_string(&target).unwrap(), "v2");
    }

    #[test]
    fn test_report_rendering() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a.txt");
        fs::write(&target, "foo").unwrap();

        let s = suggestion(target.to_str().unwrap(), "foo", "bar");
        let results = apply_suggestions(std::slice::from_ref(&s), false);
        let report = render_revision_report(&[s], &results);

        assert!(report.contains("# AI Code Revision Report"));
        assert!(report.contains("Generated: "));
        assert!(report.contains("- Total revisions: 1"));
        assert!(report.contains("- Successfully applied: 1"));
        assert!(report.contains("## Applied:"));
        assert!(report.contains("**Confidence:** 0.80"));
        assert!(report.contains("```\nfoo\n```"));
        assert!(report.contains("```\nbar\n```"));
    }
}
