//! Bug report → test plan generation.
//!
//! Combines the bug text with a prompt template, requests a structured
//! JSON test plan from the model, and validates the reply into typed test
//! cases. Structured-output mode is tried first; on any failure the call is
//! retried in plain JSON-object mode with brace-carving recovery.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::llm::{CompletionClient, CompletionRequest, ResponseFormat};
use crate::revision::response::extract_json;

// =============================================================================
// Schema types
// =============================================================================

/// Individual test step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestStep {
    /// "action" or "assertion".
    #[serde(rename = "type")]
    pub step_type: String,
    pub description: String,
}

/// Individual test case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: String,
    pub steps: Vec<TestStep>,
}

/// Complete test plan with multiple test cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestPlan {
    pub test_cases: Vec<TestCase>,
}

/// JSON schema handed to the model in structured-output mode.
fn test_plan_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "test_cases": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string" },
                        "title": { "type": "string" },
                        "description": { "type": "string" },
                        "category": { "type": "string" },
                        "priority": { "type": "string" },
                        "steps": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "type": { "type": "string" },
                                    "description": { "type": "string" }
                                },
                                "required": ["type", "description"]
                            }
                        }
                    },
                    "required": ["id", "title", "description", "category", "priority", "steps"]
                }
            }
        },
        "required": ["test_cases"]
    })
}

// =============================================================================
// Prompt assembly
// =============================================================================

/// Guidance appended to every test-plan prompt.
const TEST_PLAN_GUIDANCE: &str = "\n\nGenerate exactly 16 comprehensive test cases in the \
following format. Each test case should have:\n\
- A unique ID (TC001, TC002, etc.)\n\
- A descriptive title\n\
- A detailed description\n\
- A category (functional, error handling, security, performance, etc.)\n\
- A priority (High, Medium, Low)\n\
- Multiple detailed steps with type 'action' or 'assertion'\n\n\
Ensure the test cases cover:\n\
1. Happy path scenarios\n\
2. Error handling and edge cases\n\
3. Security considerations\n\
4. User authentication flows\n\
5. Data validation\n\
6. UI/UX interactions\n\
7. Performance considerations\n\
8. Integration scenarios\n\n\
Make sure each test case has at least 4-6 detailed steps.";

/// Interpret the first non-empty line of raw bug text as the title and the
/// rest as the description.
pub fn split_bug_text(raw: &str) -> Result<(String, String), AppError> {
    let lines: Vec<&str> = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let Some((title, rest)) = lines.split_first() else {
        return Err(AppError::Validation("Bug text is empty".into()));
    };
    Ok((title.to_string(), rest.join("\n")))
}

/// Fill the template placeholders literally — never `format!`-style, which
/// would collide with JSON braces in the template.
pub fn fill_prompt_template(template: &str, bug_title: &str, bug_description: &str) -> String {
    template
        .replace("{bug_title}", bug_title)
        .replace("{bug_description}", bug_description)
}

fn build_full_prompt(bug_text: &str, prompt_text: &str) -> String {
    format!(
        "\n{prompt_text}\n\nBug Report:\n{bug_text}\n\n\
Please generate comprehensive test cases based on this bug report and requirements.\n\
{TEST_PLAN_GUIDANCE}"
    )
}

// =============================================================================
// Generation
// =============================================================================

/// Generate a test plan for one `(bug_text, prompt_text)` pair.
pub async fn process_bug_report(
    client: &dyn CompletionClient,
    bug_text: &str,
    prompt_text: &str,
) -> Result<TestPlan, AppError> {
    let full_prompt = build_full_prompt(bug_text, prompt_text);

    // Structured outputs first.
    let structured = CompletionRequest::new(full_prompt.clone()).with_format(
        ResponseFormat::JsonSchema {
            name: "test_plan".into(),
            schema: test_plan_schema(),
        },
    );

    match client.complete(structured).await {
        Ok(reply) => {
            if let Ok(plan) = parse_test_plan(&reply) {
                return Ok(plan);
            }
            tracing::warn!("Structured reply did not validate; retrying in JSON-object mode");
        }
        Err(e) => {
            tracing::warn!(error = %e, "Structured-output call failed; retrying in JSON-object mode");
        }
    }

    // Fallback: JSON-object mode with an explicit instruction, then the
    // two-stage parse.
    let fallback = CompletionRequest::new(format!(
        "{full_prompt}\n\nReturn ONLY valid JSON with a 'test_cases' array containing test case objects."
    ))
    .with_format(ResponseFormat::JsonObject);

    let reply = client.complete(fallback).await?;
    parse_test_plan(&reply)
}

/// Validate a raw reply into a `TestPlan`.
fn parse_test_plan(reply: &str) -> Result<TestPlan, AppError> {
    let value = extract_json(reply)?;
    serde_json::from_value::<TestPlan>(value)
        .map_err(|e| AppError::ModelResponse(format!("test plan did not match schema: {e}")))
}
