//! Test-report parsing: raw execution records in, categorized failures out.
//!
//! Pure functions over owned data — no network or filesystem dependencies
//! beyond the one file read in [`parse_report_file`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

// =============================================================================
// Status and category enums
// =============================================================================

/// Execution status of one test record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
}

impl TestStatus {
    /// Parse the wire-level status string. Anything outside the closed set
    /// is a malformed record, not a silent default.
    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s {
            "PASSED" => Ok(TestStatus::Passed),
            "FAILED" => Ok(TestStatus::Failed),
            "SKIPPED" => Ok(TestStatus::Skipped),
            other => Err(AppError::MalformedRecord(format!(
                "unrecognized testStatus {other:?}"
            ))),
        }
    }
}

/// Broad failure category derived from error strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    FileUpload,
    GithubIntegration,
    ApiError,
    Validation,
    UiInteraction,
    Network,
    Authentication,
    Docker,
    Generic,
}

impl FailureCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCategory::FileUpload => "file_upload",
            FailureCategory::GithubIntegration => "github_integration",
            FailureCategory::ApiError => "api_error",
            FailureCategory::Validation => "validation",
            FailureCategory::UiInteraction => "ui_interaction",
            FailureCategory::Network => "network",
            FailureCategory::Authentication => "authentication",
            FailureCategory::Docker => "docker",
            FailureCategory::Generic => "generic",
        }
    }
}

/// Ordered phrase → category table. Evaluated top-down, first match wins,
/// so the order here is a priority list — keep it a slice, never a map.
const CATEGORY_PATTERNS: &[(&str, FailureCategory)] = &[
    ("file upload", FailureCategory::FileUpload),
    ("file drop area", FailureCategory::FileUpload),
    ("upload", FailureCategory::FileUpload),
    ("github", FailureCategory::GithubIntegration),
    ("repository", FailureCategory::GithubIntegration),
    ("401 unauthorized", FailureCategory::Authentication),
    ("api key", FailureCategory::Authentication),
    ("500 internal server error", FailureCategory::ApiError),
    ("network failure", FailureCategory::Network),
    ("validation", FailureCategory::Validation),
    ("docker", FailureCategory::Docker),
    ("health check", FailureCategory::Docker),
    ("ui", FailureCategory::UiInteraction),
    ("click", FailureCategory::UiInteraction),
    ("locator", FailureCategory::UiInteraction),
];

/// Categories whose failures are flagged critical in the summary.
const CRITICAL_CATEGORIES: &[FailureCategory] = &[
    FailureCategory::FileUpload,
    FailureCategory::Authentication,
    FailureCategory::ApiError,
];

/// Classify a failure from its combined error text. Deterministic: the same
/// inputs always yield the same category.
pub fn categorize_failure(error_message: &str, title: &str, description: &str) -> FailureCategory {
    let text = format!("{error_message} {title} {description}").to_lowercase();
    for (phrase, category) in CATEGORY_PATTERNS {
        if text.contains(phrase) {
            return *category;
        }
    }
    FailureCategory::Generic
}

/// Static remediation hints per category. Editorial data, not logic.
pub fn suggested_fixes(category: FailureCategory) -> Vec<String> {
    let fixes: &[&str] = match category {
        FailureCategory::FileUpload => &[
            "Fix file upload drag-and-drop functionality in frontend",
            "Add proper file validation and error messaging",
            "Implement file type checking and size limits",
            "Add visual feedback for file upload status",
        ],
        FailureCategory::GithubIntegration => &[
            "Verify GitHub API token configuration",
            "Add proper error handling for GitHub API responses",
            "Implement rate limiting and retry logic",
            "Add validation for GitHub URL format",
        ],
        FailureCategory::Authentication => &[
            "Configure valid API keys in environment variables",
            "Add API key validation before making requests",
            "Implement proper error handling for authentication failures",
            "Add user-friendly error messages for auth issues",
        ],
        FailureCategory::ApiError => &[
            "Add comprehensive error handling in backend endpoints",
            "Implement proper HTTP status code responses",
            "Add logging for debugging API issues",
            "Add input validation and sanitization",
        ],
        FailureCategory::Validation => &[
            "Add client-side form validation",
            "Implement server-side input validation",
            "Add user-friendly validation error messages",
            "Prevent form submission with invalid data",
        ],
        FailureCategory::UiInteraction => &[
            "Fix element selectors and locators",
            "Add proper loading states and feedback",
            "Implement better error handling in UI",
            "Add accessibility improvements",
        ],
        FailureCategory::Network => &[
            "Add network error handling and retry logic",
            "Implement offline mode detection",
            "Add timeout handling for network requests",
            "Provide user feedback for network issues",
        ],
        FailureCategory::Docker => &[
            "Fix Docker health check configuration",
            "Add proper container restart policies",
            "Implement monitoring and alerting",
            "Fix container networking issues",
        ],
        FailureCategory::Generic => &["Review and fix the underlying issue"],
    };
    fixes.iter().map(|s| s.to_string()).collect()
}

// =============================================================================
// Wire and domain types
// =============================================================================

/// One raw test-result record as delivered in the report JSON array.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTestRecord {
    #[serde(default)]
    pub test_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub test_error: String,
    pub test_status: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub test_visualization: Option<String>,
}

/// One failed test with classification and static fix hints.
/// Immutable after construction.
#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    pub test_id: String,
    pub title: String,
    pub description: String,
    pub error_message: String,
    pub category: FailureCategory,
    pub code_snippet: Option<String>,
    pub visualization_url: Option<String>,
    pub suggested_fixes: Vec<String>,
}

/// Aggregate statistics over the failures of one report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    /// Per-category failure counts, sorted descending by count.
    pub category_counts: Vec<(FailureCategory, usize)>,
    /// Failures in a critical category (file_upload, authentication, api_error).
    pub critical_failures: Vec<FailureRecord>,
    pub total_suggested_fixes: usize,
}

/// Full parse result for one report.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failures: Vec<FailureRecord>,
    pub summary: ReportSummary,
}

impl ParsedReport {
    pub fn failures_by_category(&self, category: FailureCategory) -> Vec<&FailureRecord> {
        self.failures
            .iter()
            .filter(|f| f.category == category)
            .collect()
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parse a report from raw records.
///
/// PASSED and SKIPPED records are counted but produce no failure; an
/// unrecognized status fails the whole parse with a malformed-record error.
pub fn parse_records(records: &[RawTestRecord]) -> Result<ParsedReport, AppError> {
    let mut failures = Vec::new();
    let mut passed = 0usize;
    let mut failed = 0usize;
    let mut skipped = 0usize;

    for record in records {
        match TestStatus::parse(&record.test_status)? {
            TestStatus::Passed => passed += 1,
            TestStatus::Skipped => skipped += 1,
            TestStatus::Failed => {
                failed += 1;
                failures.push(extract_failure(record));
            }
        }
    }

    let summary = summarize(&failures);

    Ok(ParsedReport {
        total: records.len(),
        passed,
        failed,
        skipped,
        failures,
        summary,
    })
}

/// Parse a report from a JSON file on disk.
pub fn parse_report_file(path: &Path) -> Result<ParsedReport, AppError> {
    let raw = std::fs::read_to_string(path)?;
    let records: Vec<RawTestRecord> = serde_json::from_str(&raw)?;
    parse_records(&records)
}

fn extract_failure(record: &RawTestRecord) -> FailureRecord {
    let category = categorize_failure(&record.test_error, &record.title, &record.description);
    FailureRecord {
        test_id: record.test_id.clone(),
        title: record.title.clone(),
        description: record.description.clone(),
        error_message: record.test_error.clone(),
        category,
        code_snippet: record.code.clone(),
        visualization_url: record.test_visualization.clone(),
        suggested_fixes: suggested_fixes(category),
    }
}

fn summarize(failures: &[FailureRecord]) -> ReportSummary {
    let mut counts: Vec<(FailureCategory, usize)> = Vec::new();
    for failure in failures {
        match counts.iter_mut().find(|(c, _)| *c == failure.category) {
            Some((_, n)) => *n += 1,
            None => counts.push((failure.category, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let critical_failures = failures
        .iter()
        .filter(|f| CRITICAL_CATEGORIES.contains(&f.category))
        .cloned()
        .collect();

    ReportSummary {
        category_counts: counts,
        critical_failures,
        total_suggested_fixes: failures.iter().map(|f| f.suggested_fixes.len()).sum(),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn failed_record(id: &str, error: &str) -> RawTestRecord {
        RawTestRecord {
            test_id: id.to_string(),
            test_error: error.to_string(),
            test_status: "FAILED".to_string(),
            ..Default::default()
        }
    }

    fn status_record(status: &str) -> RawTestRecord {
        RawTestRecord {
            test_status: status.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_status_parse_rejects_unknown() {
        assert!(TestStatus::parse("PASSED").is_ok());
        assert!(TestStatus::parse("SKIPPED").is_ok());
        let err = TestStatus::parse("ERRORED").unwrap_err();
        assert_eq!(err.kind(), "malformed_record");
    }

    #[test]
    fn test_counts_are_conserved() {
        let records = vec![
            status_record("PASSED"),
            status_record("PASSED"),
            status_record("SKIPPED"),
            failed_record("TC1", "network failure during call"),
            failed_record("TC2", "something odd"),
        ];
        let report = parse_records(&records).unwrap();
        assert_eq!(report.total, 5);
        assert_eq!(report.passed + report.failed + report.skipped, report.total);
        assert_eq!(report.failures.len(), report.failed);
        assert_eq!(report.failed, 2);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn test_authentication_scenario() {
        let records = vec![failed_record("TC1", "401 unauthorized api key")];
        let report = parse_records(&records).unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].category, FailureCategory::Authentication);
    }

    #[test]
    fn test_first_match_ordering() {
        // "file upload" precedes "github" in the table, so a message with
        // both must classify as file_upload.
        let category = categorize_failure("file upload failed against github remote", "", "");
        assert_eq!(category, FailureCategory::FileUpload);
    }

    #[test]
    fn test_categorization_is_case_insensitive_and_scans_all_fields() {
        assert_eq!(
            categorize_failure("", "Docker Health Problem", ""),
            FailureCategory::Docker
        );
        assert_eq!(
            categorize_failure("", "", "element LOCATOR never resolved"),
            FailureCategory::UiInteraction
        );
    }

    #[test]
    fn test_categorization_is_idempotent() {
        let record = failed_record("TC9", "500 internal server error from backend");
        let a = parse_records(&[record.clone()]).unwrap();
        let b = parse_records(&[record]).unwrap();
        assert_eq!(a.failures[0].category, b.failures[0].category);
        assert_eq!(a.failures[0].category, FailureCategory::ApiError);
    }

    #[test]
    fn test_unmatched_falls_back_to_generic() {
        let records = vec![failed_record("TC3", "completely novel breakage")];
        let report = parse_records(&records).unwrap();
        assert_eq!(report.failures[0].category, FailureCategory::Generic);
        assert_eq!(report.failures[0].suggested_fixes.len(), 1);
    }

    #[test]
    fn test_summary_aggregation() {
        let records = vec![
            failed_record("TC1", "file upload broken"),
            failed_record("TC2", "upload hangs"),
            failed_record("TC3", "401 unauthorized"),
            failed_record("TC4", "mystery"),
        ];
        let report = parse_records(&records).unwrap();
        let summary = &report.summary;

        // Sorted descending by count, file_upload first with 2.
        assert_eq!(summary.category_counts[0], (FailureCategory::FileUpload, 2));
        // file_upload x2 and authentication are critical; generic is not.
        assert_eq!(summary.critical_failures.len(), 3);
        // 4 hints per non-generic failure, 1 for generic.
        assert_eq!(summary.total_suggested_fixes, 4 + 4 + 4 + 1);
    }

    #[test]
    fn test_wire_deserialization() {
        let raw = r#"[{"testStatus":"FAILED","testError":"401 unauthorized api key","testId":"TC1"}]"#;
        let records: Vec<RawTestRecord> = serde_json::from_str(raw).unwrap();
        let report = parse_records(&records).unwrap();
        assert_eq!(report.failures[0].test_id, "TC1");
        assert_eq!(report.failures[0].category, FailureCategory::Authentication);
    }

    #[test]
    fn test_failures_by_category() {
        let records = vec![
            failed_record("TC1", "docker health check flapping"),
            failed_record("TC2", "click target missing"),
        ];
        let report = parse_records(&records).unwrap();
        assert_eq!(report.failures_by_category(FailureCategory::Docker).len(), 1);
        assert_eq!(
            report.failures_by_category(FailureCategory::UiInteraction).len(),
            1
        );
        assert!(report.failures_by_category(FailureCategory::Network).is_empty());
    }
}
