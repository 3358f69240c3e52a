use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::AppError;

use super::{CompletionClient, CompletionRequest, ResponseFormat};

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

// ============================================================================
// OpenAiClient
// ============================================================================

/// HTTP client for an OpenAI-style chat-completions endpoint.
pub struct OpenAiClient {
    http: reqwest::Client,
    config: EngineConfig,
}

impl OpenAiClient {
    /// Create a new client from explicit configuration.
    ///
    /// The underlying `reqwest::Client` is configured with a 60-second
    /// timeout; a call runs to completion or to this timeout, with no
    /// cancellation path.
    pub fn new(config: EngineConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;
        Ok(Self { http, config })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Render the requested response format as the wire-level
    /// `response_format` object, or None for plain text.
    fn render_format(format: &ResponseFormat) -> Option<serde_json::Value> {
        match format {
            ResponseFormat::Text => None,
            ResponseFormat::JsonObject => Some(serde_json::json!({ "type": "json_object" })),
            ResponseFormat::JsonSchema { name, schema } => Some(serde_json::json!({
                "type": "json_schema",
                "json_schema": { "name": name, "schema": schema },
            })),
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    fn backend_name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, AppError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.user,
        });

        let body = ChatCompletionBody {
            model: &self.config.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: Self::render_format(&request.format),
        };

        tracing::debug!(
            model = %self.config.model,
            prompt_chars = request.user.len(),
            "Sending completion request"
        );

        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::ModelResponse(format!(
                "completion endpoint returned {status}: {detail}"
            )));
        }

        let parsed: ChatCompletionResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AppError::ModelResponse("reply contained no choices".into()))?;

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_format_variants() {
        assert!(OpenAiClient::render_format(&ResponseFormat::Text).is_none());

        let obj = OpenAiClient::render_format(&ResponseFormat::JsonObject).unwrap();
        assert_eq!(obj.get("type").and_then(|v| v.as_str()), Some("json_object"));

        let schema = OpenAiClient::render_format(&ResponseFormat::JsonSchema {
            name: "test_plan".into(),
            schema: serde_json::json!({"type": "object"}),
        })
        .unwrap();
        assert_eq!(schema.get("type").and_then(|v| v.as_str()), Some("json_schema"));
        assert_eq!(
            schema.pointer("/json_schema/name").and_then(|v| v.as_str()),
            Some("test_plan")
        );
    }

    #[test]
    fn test_completions_url_trims_trailing_slash() {
        let config = EngineConfig::new(
            "sk-test".into(),
            "gpt-4.1-mini".into(),
            "http://localhost:9999/v1/".into(),
        )
        .unwrap();
        let client = OpenAiClient::new(config).unwrap();
        assert_eq!(client.completions_url(), "http://localhost:9999/v1/chat/completions");
    }

    #[test]
    fn test_body_omits_absent_fields() {
        let body = ChatCompletionBody {
            model: "gpt-4.1-mini",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            temperature: None,
            max_tokens: None,
            response_format: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("temperature").is_none());
        assert!(json.get("response_format").is_none());
        assert_eq!(json.pointer("/messages/0/role").and_then(|v| v.as_str()), Some("user"));
    }
}
