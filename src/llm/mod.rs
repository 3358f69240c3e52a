pub mod openai;

use async_trait::async_trait;

use crate::error::AppError;

// =============================================================================
// ResponseFormat — how the model is asked to shape its reply
// =============================================================================

/// Requested response shape for a completion call.
///
/// No conformance guarantee is assumed by callers; every reply is parsed
/// defensively regardless of the requested format.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseFormat {
    /// Free text, no constraint.
    Text,
    /// JSON-object mode: the model must emit a single JSON object.
    JsonObject,
    /// Structured outputs: the model is handed a named JSON schema.
    JsonSchema {
        name: String,
        schema: serde_json::Value,
    },
}

// =============================================================================
// CompletionRequest
// =============================================================================

/// One outbound completion call.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub user: String,
    pub format: ResponseFormat,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            system: None,
            user: user.into(),
            format: ResponseFormat::Text,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_format(mut self, format: ResponseFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

// =============================================================================
// CompletionClient trait
// =============================================================================

/// Abstraction over the LLM completion backend.
///
/// The engine only ever sees free text back; schema validation happens on
/// the caller side. Calls are issued strictly sequentially — one request is
/// awaited to completion before the next is built.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Human-readable backend name for error messages and logs.
    fn backend_name(&self) -> &'static str;

    /// Send one completion request and return the raw reply text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, AppError>;
}
