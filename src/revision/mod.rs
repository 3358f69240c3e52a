//! AI-assisted revision pipeline: bucket failures by likely root cause,
//! ask the model for one literal-text patch per bucket, attach diffs, and
//! hand the results to the applier.

pub mod apply;
pub mod diff;
pub mod prompt;
pub mod response;
pub mod types;

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::AppError;
use crate::llm::{CompletionClient, CompletionRequest, ResponseFormat};
use crate::report::{self, FailureRecord};

pub use apply::{apply_suggestions, render_revision_report};
pub use diff::{compute_diff, FileDiff};
pub use types::{ChangeKind, PatchSuggestion};

/// Maximum files included in the gathered code context.
const MAX_CONTEXT_FILES: usize = 3;
/// Files larger than this are truncated before entering the context.
const LARGE_FILE_CHARS: usize = 10_000;

// =============================================================================
// Buckets
// =============================================================================

/// Keyword-defined grouping of failures believed to share a root cause.
/// One bucket scopes one model request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevisionBucket {
    FileUpload,
    GithubIntegration,
    UiInteraction,
    ApiAuthentication,
    FormValidation,
    General,
}

impl RevisionBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevisionBucket::FileUpload => "file_upload",
            RevisionBucket::GithubIntegration => "github_integration",
            RevisionBucket::UiInteraction => "ui_interaction",
            RevisionBucket::ApiAuthentication => "api_authentication",
            RevisionBucket::FormValidation => "form_validation",
            RevisionBucket::General => "general",
        }
    }
}

/// Fixed bucket evaluation order; a failure lands in the first bucket whose
/// keyword test it satisfies.
const BUCKET_ORDER: &[RevisionBucket] = &[
    RevisionBucket::FileUpload,
    RevisionBucket::GithubIntegration,
    RevisionBucket::UiInteraction,
    RevisionBucket::ApiAuthentication,
    RevisionBucket::FormValidation,
    RevisionBucket::General,
];

fn bucket_matches(bucket: RevisionBucket, error_lower: &str) -> bool {
    match bucket {
        RevisionBucket::FileUpload => {
            error_lower.contains("file") && error_lower.contains("upload")
        }
        RevisionBucket::GithubIntegration => error_lower.contains("github"),
        RevisionBucket::UiInteraction => {
            error_lower.contains("locator")
                || error_lower.contains("timeout")
                || error_lower.contains("element")
        }
        RevisionBucket::ApiAuthentication => {
            error_lower.contains("api")
                && (error_lower.contains("key") || error_lower.contains("token"))
        }
        RevisionBucket::FormValidation => {
            error_lower.contains("validation") || error_lower.contains("required")
        }
        RevisionBucket::General => true,
    }
}

/// Partition failures into ordered buckets; empty buckets are dropped.
pub fn partition_failures(failures: &[FailureRecord]) -> Vec<(RevisionBucket, Vec<&FailureRecord>)> {
    let mut buckets: Vec<(RevisionBucket, Vec<&FailureRecord>)> =
        BUCKET_ORDER.iter().map(|b| (*b, Vec::new())).collect();

    for failure in failures {
        let error_lower = failure.error_message.to_lowercase();
        for (bucket, members) in buckets.iter_mut() {
            if bucket_matches(*bucket, &error_lower) {
                members.push(failure);
                break;
            }
        }
    }

    buckets.retain(|(_, members)| !members.is_empty());
    buckets
}

// =============================================================================
// Context gathering
// =============================================================================

/// Gather a bounded set of relevant source files for prompt context.
///
/// The main app module and the main template are always considered; one
/// extra file is added from the first failure whose error names file
/// uploads or the GitHub integration. At most [`MAX_CONTEXT_FILES`] files
/// are read, and very large files are truncated immediately.
pub fn gather_code_context(
    project_root: &Path,
    failures: &[FailureRecord],
) -> BTreeMap<String, String> {
    let mut candidates = vec![
        project_root.join("app.py"),
        project_root.join("frontend/templates/index.html"),
    ];

    for failure in failures {
        let error_lower = failure.error_message.to_lowercase();
        if error_lower.contains("file upload") {
            candidates.push(project_root.join("frontend/static/js/main.js"));
            break;
        } else if error_lower.contains("github") {
            candidates.push(project_root.join(".env.example"));
            break;
        }
    }

    let mut context = BTreeMap::new();
    for path in candidates.into_iter().take(MAX_CONTEXT_FILES) {
        if !path.exists() {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(mut content) => {
                if content.len() > LARGE_FILE_CHARS {
                    let lines: Vec<&str> = content.lines().collect();
                    if lines.len() > 100 {
                        let mut kept: Vec<&str> = lines[..50].to_vec();
                        kept.push("... (file truncated) ...");
                        kept.extend_from_slice(&lines[lines.len() - 25..]);
                        content = kept.join("\n");
                    }
                }
                context.insert(path.to_string_lossy().into_owned(), content);
            }
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "Could not read context file");
            }
        }
    }

    context
}

/// Extract deduplicated error-pattern hints from the failures, in first-seen
/// order.
pub fn extract_error_patterns(failures: &[FailureRecord]) -> Vec<String> {
    let mut patterns: Vec<String> = Vec::new();
    let mut push = |patterns: &mut Vec<String>, hint: &str| {
        if !patterns.iter().any(|p| p == hint) {
            patterns.push(hint.to_string());
        }
    };

    for failure in failures {
        let error = failure.error_message.to_lowercase();

        if error.contains("timeout") {
            push(&mut patterns, "UI element timeout - elements not responding quickly enough");
        }
        if error.contains("locator") || error.contains("element not found") {
            push(&mut patterns, "Element selector issues - UI elements not properly accessible");
        }
        if error.contains("file") && error.contains("upload") {
            push(&mut patterns, "File upload functionality issues");
        }
        if error.contains("github") {
            push(&mut patterns, "GitHub API integration problems");
        }
        if error.contains("api") && (error.contains("key") || error.contains("token")) {
            push(&mut patterns, "API authentication and configuration issues");
        }
        if error.contains("validation") || error.contains("required") {
            push(&mut patterns, "Form validation and input handling issues");
        }
    }

    patterns
}

// =============================================================================
// RevisionEngine
// =============================================================================

/// Orchestrates the report → buckets → model → suggestions pipeline.
///
/// Every model call is awaited to completion before the next bucket is
/// processed; N non-empty buckets mean N sequential outbound calls.
pub struct RevisionEngine {
    client: Box<dyn CompletionClient>,
}

impl RevisionEngine {
    pub fn new(client: Box<dyn CompletionClient>) -> Self {
        Self { client }
    }

    /// Full pipeline: parse the report, gather context, and synthesize one
    /// suggestion per non-empty bucket. A passing report yields an empty
    /// list, not an error.
    pub async fn analyze_and_fix_failures(
        &self,
        report_path: &Path,
        project_root: &Path,
    ) -> Result<Vec<PatchSuggestion>, AppError> {
        let parsed = report::parse_report_file(report_path)?;
        if parsed.failures.is_empty() {
            tracing::info!("No failures in report; nothing to revise");
            return Ok(Vec::new());
        }

        let code_context = gather_code_context(project_root, &parsed.failures);
        let error_patterns = extract_error_patterns(&parsed.failures);

        Ok(self
            .synthesize(&parsed.failures, &code_context, &error_patterns)
            .await)
    }

    /// Ask the model for one patch per bucket. A bucket whose call or parse
    /// fails yields nothing; the run continues with the remaining buckets.
    pub async fn synthesize(
        &self,
        failures: &[FailureRecord],
        code_context: &BTreeMap<String, String>,
        error_patterns: &[String],
    ) -> Vec<PatchSuggestion> {
        let mut suggestions = Vec::new();

        for (bucket, members) in partition_failures(failures) {
            let user_prompt =
                prompt::build_revision_prompt(bucket, &members, code_context, error_patterns);

            let request = CompletionRequest::new(user_prompt)
                .with_system(prompt::REVISION_SYSTEM_PROMPT)
                .with_format(ResponseFormat::JsonObject)
                .with_temperature(0.1)
                .with_max_tokens(2000);

            let reply = match self.client.complete(request).await {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::warn!(
                        bucket = bucket.as_str(),
                        error = %e,
                        "Model call failed for bucket"
                    );
                    continue;
                }
            };

            match response::parse_suggestion(&reply, &members) {
                Ok(mut suggestion) => {
                    suggestion.diff = Some(compute_diff(
                        &suggestion.file_path,
                        &suggestion.original_text,
                        &suggestion.revised_text,
                    ));
                    suggestions.push(suggestion);
                }
                Err(e) => {
                    tracing::warn!(
                        bucket = bucket.as_str(),
                        error = %e,
                        "Discarding unparseable reply for bucket"
                    );
                }
            }
        }

        suggestions
    }
}

// =============================================================================
// Tests
// =============================================================================
