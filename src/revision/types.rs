use serde::Serialize;

use super::diff::FileDiff;

/// What kind of change a suggestion represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Fix,
    Enhancement,
    Refactor,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Fix => "fix",
            ChangeKind::Enhancement => "enhancement",
            ChangeKind::Refactor => "refactor",
        }
    }

    /// Parse the model-reported change type, defaulting to `Fix` for
    /// anything unrecognized.
    pub fn parse(s: &str) -> Self {
        match s {
            "enhancement" => ChangeKind::Enhancement,
            "refactor" => ChangeKind::Refactor,
            _ => ChangeKind::Fix,
        }
    }
}

/// One proposed literal text substitution for one file.
///
/// Created from a validated model response; mutated once to attach the
/// computed diff; consumed read-only by the applier. `original_text` being a
/// substring of the file is only guaranteed at apply time, where it is
/// re-checked — the file may have changed since generation.
#[derive(Debug, Clone, Serialize)]
pub struct PatchSuggestion {
    pub file_path: String,
    pub original_text: String,
    pub revised_text: String,
    pub explanation: String,
    /// Model-reported confidence, clamped to [0, 1]. Defaults to 0.8.
    pub confidence: f64,
    pub addressed_test_ids: Vec<String>,
    pub change_kind: ChangeKind,
    pub diff: Option<FileDiff>,
}
