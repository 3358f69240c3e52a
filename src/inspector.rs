//! Static project inspection: walk the tree once, then run fixed
//! substring-rule checks against the files relevant to each failure.
//!
//! The rules are a static table of editorial judgments (pattern, severity,
//! fix string), not inferred logic.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use walkdir::WalkDir;

use crate::report::{FailureCategory, FailureRecord};
use crate::revision::{ChangeKind, PatchSuggestion};

/// Directory names excluded from the scan (version control, caches,
/// dependency trees).
const EXCLUDED_DIRS: &[&str] = &[
    ".git",
    "__pycache__",
    "node_modules",
    ".pytest_cache",
    "target",
    "tmp",
];

/// Extensions treated as frontend markup/script/style.
const FRONTEND_EXTENSIONS: &[&str] = &["html", "js", "css"];
/// Extension treated as backend source.
const BACKEND_EXTENSION: &str = "py";
/// Path component that marks a file as frontend regardless of extension.
const FRONTEND_MARKER: &str = "frontend";

// =============================================================================
// Issue
// =============================================================================

/// Issue severity, most urgent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

/// One statically-detected code issue tied to a failure category.
/// Not persisted; consumed immediately by patch generation.
#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    pub file_path: String,
    pub line_number: Option<usize>,
    pub issue_type: String,
    pub description: String,
    pub suggested_fix: String,
    pub severity: Severity,
    pub related_failure_id: Option<String>,
}

// =============================================================================
// CodeInspector
// =============================================================================

/// Scans a project tree once and answers static rule checks against it.
pub struct CodeInspector {
    project_root: PathBuf,
    frontend_files: Vec<PathBuf>,
    backend_files: Vec<PathBuf>,
}

impl CodeInspector {
    /// Walk the project and split relevant files into frontend/backend sets.
    /// Unreadable entries are skipped; the scan is best-effort.
    pub fn scan(project_root: &Path) -> Self {
        let mut frontend_files = Vec::new();
        let mut backend_files = Vec::new();

        let walker = WalkDir::new(project_root).into_iter().filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            !(e.file_type().is_dir() && EXCLUDED_DIRS.contains(&name.as_ref()))
        });

        for entry in walker.flatten() {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_ascii_lowercase();

            // Only source extensions are considered at all; a frontend
            // directory does not promote assets like images.
            let frontend_ext = FRONTEND_EXTENSIONS.contains(&ext.as_str());
            if !frontend_ext && ext != BACKEND_EXTENSION {
                continue;
            }

            let in_frontend = path
                .components()
                .any(|c| c.as_os_str().to_string_lossy() == FRONTEND_MARKER);

            if in_frontend || frontend_ext {
                frontend_files.push(path.to_path_buf());
            } else {
                backend_files.push(path.to_path_buf());
            }
        }

        tracing::debug!(
            root = %project_root.display(),
            frontend = frontend_files.len(),
            backend = backend_files.len(),
            "Project scan complete"
        );

        Self {
            project_root: project_root.to_path_buf(),
            frontend_files,
            backend_files,
        }
    }

    pub fn frontend_files(&self) -> &[PathBuf] {
        &self.frontend_files
    }

    pub fn backend_files(&self) -> &[PathBuf] {
        &self.backend_files
    }

    /// Run the category-specific rule checks for every failure.
    ///
    /// A failure whose category has no checker, or whose files match no
    /// rule, contributes nothing — that is not an error.
    pub fn analyze(&self, failures: &[FailureRecord]) -> Vec<Issue> {
        let mut issues = Vec::new();
        for failure in failures {
            match failure.category {
                FailureCategory::FileUpload => self.check_file_upload(failure, &mut issues),
                FailureCategory::GithubIntegration => self.check_github(failure, &mut issues),
                FailureCategory::Authentication => self.check_auth(failure, &mut issues),
                FailureCategory::ApiError => self.check_api(failure, &mut issues),
                FailureCategory::Validation => self.check_validation(failure, &mut issues),
                FailureCategory::UiInteraction => self.check_ui(failure, &mut issues),
                _ => {}
            }
        }
        issues
    }

    /// Group issues by file path, preserving a deterministic path order.
    pub fn group_by_file(issues: Vec<Issue>) -> BTreeMap<String, Vec<Issue>> {
        let mut grouped: BTreeMap<String, Vec<Issue>> = BTreeMap::new();
        for issue in issues {
            grouped.entry(issue.file_path.clone()).or_default().push(issue);
        }
        grouped
    }

    /// Turn detected issues into applier-compatible suggestions via the
    /// static fix templates, one suggestion per file with at least one
    /// effective fix.
    ///
    /// Whole-file suggestions: `original_text` is the full current content,
    /// so the applier's first-occurrence substitution rewrites the file.
    pub fn generate_revisions(&self, issues: Vec<Issue>) -> Vec<PatchSuggestion> {
        let mut suggestions = Vec::new();
        for (file_path, file_issues) in Self::group_by_file(issues) {
            if let Some(suggestion) = file_revision(&file_path, &file_issues) {
                suggestions.push(suggestion);
            }
        }
        suggestions
    }

    // ------------------------------------------------------------------
    // Category checkers
    // ------------------------------------------------------------------

    fn check_file_upload(&self, failure: &FailureRecord, issues: &mut Vec<Issue>) {
        for file in self.html_files() {
            let Some(content) = read_best_effort(&file) else {
                continue;
            };

            if !content.contains("type=\"file\"") && content.contains("file-drop") {
                issues.push(issue(
                    &file,
                    "missing_file_input",
                    "File upload area exists but no actual file input element",
                    "Add hidden file input element and connect it to the drop area",
                    Severity::Critical,
                    failure,
                ));
            }

            if !content.contains("ondrop") && !content.contains("drop") {
                issues.push(issue(
                    &file,
                    "missing_drag_drop",
                    "Missing drag and drop event handlers",
                    "Add ondrop, ondragover, and ondragenter event handlers",
                    Severity::High,
                    failure,
                ));
            }
        }
    }

    fn check_github(&self, failure: &FailureRecord, issues: &mut Vec<Issue>) {
        for file in self.app_entry_files() {
            let Some(content) = read_best_effort(&file) else {
                continue;
            };

            if !content.contains("GITHUB_TOKEN") && content.to_lowercase().contains("github") {
                issues.push(issue(
                    &file,
                    "missing_github_token",
                    "GitHub API calls without proper token configuration",
                    "Add GITHUB_TOKEN environment variable and use it in API calls",
                    Severity::Critical,
                    failure,
                ));
            }

            if content.contains("/github-issue") && !content.contains("try:") {
                issues.push(issue(
                    &file,
                    "missing_error_handling",
                    "GitHub endpoint lacks proper error handling",
                    "Add try-catch blocks and proper error responses",
                    Severity::High,
                    failure,
                ));
            }
        }
    }

    fn check_auth(&self, failure: &FailureRecord, issues: &mut Vec<Issue>) {
        for name in [".env", ".env.example"] {
            let env_file = self.project_root.join(name);
            if !env_file.exists() {
                continue;
            }
            let Some(content) = read_best_effort(&env_file) else {
                continue;
            };

            if !content.contains("OPENAI_API_KEY") || !content.contains("GITHUB_TOKEN") {
                issues.push(issue(
                    &env_file,
                    "missing_api_keys",
                    "Missing required API keys in environment configuration",
                    "Add OPENAI_API_KEY and GITHUB_TOKEN to environment file",
                    Severity::Critical,
                    failure,
                ));
            }
        }
    }

    fn check_api(&self, failure: &FailureRecord, issues: &mut Vec<Issue>) {
        for file in self.app_entry_files() {
            let Some(content) = read_best_effort(&file) else {
                continue;
            };

            if content.contains("@app.route") && !content.contains("except") {
                issues.push(issue(
                    &file,
                    "missing_exception_handling",
                    "API endpoints lack comprehensive exception handling",
                    "Add try-catch blocks with proper HTTP error responses",
                    Severity::High,
                    failure,
                ));
            }

            if content.contains("request.json") && !content.contains("validate") {
                issues.push(issue(
                    &file,
                    "missing_input_validation",
                    "API endpoints lack input validation",
                    "Add input validation for all request parameters",
                    Severity::Medium,
                    failure,
                ));
            }
        }
    }

    fn check_validation(&self, failure: &FailureRecord, issues: &mut Vec<Issue>) {
        for file in self.html_files() {
            let Some(content) = read_best_effort(&file) else {
                continue;
            };

            if content.contains("<form") && !content.contains("required") {
                issues.push(issue(
                    &file,
                    "missing_form_validation",
                    "Form inputs lack validation attributes",
                    "Add required, pattern, and other validation attributes to form inputs",
                    Severity::Medium,
                    failure,
                ));
            }

            if content.contains("function") && !content.to_lowercase().contains("validate") {
                issues.push(issue(
                    &file,
                    "missing_js_validation",
                    "Missing JavaScript form validation",
                    "Add JavaScript validation functions for form inputs",
                    Severity::Medium,
                    failure,
                ));
            }
        }
    }

    fn check_ui(&self, failure: &FailureRecord, issues: &mut Vec<Issue>) {
        // UI checks key off the failure text itself; the flagged file is the
        // main template by convention.
        let template = self.project_root.join("frontend/templates/index.html");

        if failure.error_message.contains("locator") {
            issues.push(issue(
                &template,
                "element_selector_issue",
                "UI elements not properly accessible for testing",
                "Add stable IDs and data attributes to UI elements",
                Severity::Medium,
                failure,
            ));
        }

        if failure.error_message.to_lowercase().contains("timeout") {
            issues.push(issue(
                &template,
                "slow_ui_response",
                "UI elements taking too long to respond",
                "Add loading states and optimize UI responsiveness",
                Severity::Medium,
                failure,
            ));
        }
    }

    // ------------------------------------------------------------------
    // File selection helpers
    // ------------------------------------------------------------------

    fn html_files(&self) -> Vec<PathBuf> {
        self.frontend_files
            .iter()
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("html"))
            .cloned()
            .collect()
    }

    /// Backend entry points (the web app module), where route-level rules
    /// apply.
    fn app_entry_files(&self) -> Vec<PathBuf> {
        self.backend_files
            .iter()
            .filter(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().contains("app.py"))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }
}

fn issue(
    path: &Path,
    issue_type: &str,
    description: &str,
    suggested_fix: &str,
    severity: Severity,
    failure: &FailureRecord,
) -> Issue {
    Issue {
        file_path: path.to_string_lossy().into_owned(),
        line_number: None,
        issue_type: issue_type.to_string(),
        description: description.to_string(),
        suggested_fix: suggested_fix.to_string(),
        severity,
        related_failure_id: Some(failure.test_id.clone()),
    }
}

fn read_best_effort(path: &Path) -> Option<String> {
    std::fs::read_to_string(path).ok()
}

// =============================================================================
// Static fix templates
// =============================================================================

static FILE_DROP_DIV: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(<div[^>]*class="[^"]*file-drop[^"]*"[^>]*>)"#).unwrap());
static IMPORT_ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(import os\n|from flask import Flask\n)").unwrap());
static GITHUB_GET_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(requests\.get\([^)]*github\.com[^)]*\))").unwrap());
static ROUTE_HANDLER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(@app\.route[^\n]*\n[^\n]*def [^(]*\([^)]*\):[^\n]*\n)").unwrap());
static RETURN_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(    return [^\n]*\n)").unwrap());
static REPO_URL_INPUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(<input[^>]*name="repo_url"[^>]*)(>)"#).unwrap());
static ISSUE_NUMBER_INPUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(<input[^>]*name="issue_number"[^>]*)(>)"#).unwrap());

const HIDDEN_FILE_INPUT: &str = "$1\n                <input type=\"file\" id=\"fileInput\" \
style=\"display: none;\" accept=\".txt,.md,.json,.py,.js,.html,.css\">";

const DRAG_DROP_SNIPPET: &str = r#"
            // Drag and drop functionality
            const fileDropArea = document.querySelector('.file-drop');
            const fileInput = document.getElementById('fileInput');

            if (fileDropArea) {
                fileDropArea.addEventListener('dragover', (e) => {
                    e.preventDefault();
                    fileDropArea.classList.add('drag-over');
                });

                fileDropArea.addEventListener('dragleave', (e) => {
                    e.preventDefault();
                    fileDropArea.classList.remove('drag-over');
                });

                fileDropArea.addEventListener('drop', (e) => {
                    e.preventDefault();
                    fileDropArea.classList.remove('drag-over');
                    const files = e.dataTransfer.files;
                    if (files.length > 0) {
                        handleFileUpload(files[0]);
                    }
                });

                fileDropArea.addEventListener('click', () => {
                    fileInput.click();
                });
            }

            if (fileInput) {
                fileInput.addEventListener('change', (e) => {
                    if (e.target.files.length > 0) {
                        handleFileUpload(e.target.files[0]);
                    }
                });
            }
"#;

/// Build a whole-file suggestion for one grouped file, or None when no
/// template applies (or none changes the content).
fn file_revision(file_path: &str, issues: &[Issue]) -> Option<PatchSuggestion> {
    let original = read_best_effort(Path::new(file_path))?;

    let is_html = file_path.ends_with(".html");
    let is_py = file_path.ends_with(".py");

    let mut revised = original.clone();
    let mut explanations: Vec<&str> = Vec::new();
    let mut addressed: Vec<String> = Vec::new();

    for issue in issues {
        let (fixer, explanation): (fn(String) -> String, &str) =
            match (issue.issue_type.as_str(), is_html, is_py) {
                ("missing_file_input", true, _) => (
                    fix_file_input,
                    "Added hidden file input element connected to drop area",
                ),
                ("missing_drag_drop", true, _) => {
                    (fix_drag_drop, "Added drag and drop event handlers")
                }
                ("missing_github_token", _, true) => (
                    fix_github_token,
                    "Added GitHub token configuration and usage",
                ),
                ("missing_error_handling", _, true) => {
                    (fix_error_handling, "Added comprehensive error handling")
                }
                ("missing_form_validation", true, _) => {
                    (fix_form_validation, "Added form validation attributes")
                }
                _ => continue,
            };

        revised = fixer(revised);
        explanations.push(explanation);
        if let Some(id) = &issue.related_failure_id {
            if !addressed.contains(id) {
                addressed.push(id.clone());
            }
        }
    }

    if revised == original {
        return None;
    }

    Some(PatchSuggestion {
        file_path: file_path.to_string(),
        original_text: original,
        revised_text: revised,
        explanation: explanations.join("; "),
        // Template substitutions are deterministic.
        confidence: 1.0,
        addressed_test_ids: addressed,
        change_kind: ChangeKind::Fix,
        diff: None,
    })
}

fn fix_file_input(code: String) -> String {
    if !code.contains("type=\"file\"") && code.contains("file-drop") {
        FILE_DROP_DIV.replace_all(&code, HIDDEN_FILE_INPUT).into_owned()
    } else {
        code
    }
}

fn fix_drag_drop(code: String) -> String {
    if !code.contains("ondrop") && code.contains("file-drop") && code.contains("</script>") {
        code.replace(
            "</script>",
            &format!("{DRAG_DROP_SNIPPET}\n        </script>"),
        )
    } else {
        code
    }
}

fn fix_github_token(code: String) -> String {
    if code.contains("GITHUB_TOKEN") || !code.to_lowercase().contains("github") {
        return code;
    }
    let code = IMPORT_ANCHOR
        .replace(
            &code,
            "$1\n# Load GitHub token\nGITHUB_TOKEN = os.getenv(\"GITHUB_TOKEN\")\n",
        )
        .into_owned();
    GITHUB_GET_CALL
        .replace_all(
            &code,
            "$1, headers={\"Authorization\": f\"token {GITHUB_TOKEN}\"} if GITHUB_TOKEN else {})",
        )
        .into_owned()
}

fn fix_error_handling(code: String) -> String {
    let code = ROUTE_HANDLER.replace_all(&code, "$1    try:\n").into_owned();
    RETURN_LINE
        .replace_all(
            &code,
            "    except Exception as e:\n        return jsonify({\"error\": str(e)}), 500\n$1",
        )
        .into_owned()
}

fn fix_form_validation(code: String) -> String {
    let code = REPO_URL_INPUT
        .replace_all(
            &code,
            "$1 required pattern=\"https://github.com/[^/]+/[^/]+\"$2",
        )
        .into_owned();
    ISSUE_NUMBER_INPUT
        .replace_all(&code, "$1 required pattern=\"[0-9]+\" min=\"1\"$2")
        .into_owned()
}

// =============================================================================
// Tests
// =============================================================================
