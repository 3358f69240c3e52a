use crate::error::AppError;

/// Default chat model when OPENAI_MODEL is unset.
const DEFAULT_MODEL: &str = "gpt-4.1-mini";
/// Default API base URL when OPENAI_BASE_URL is unset.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Explicit engine configuration, passed into component constructors.
///
/// Nothing in the crate reads ambient process state after this is built;
/// a missing API key fails here, before any network call.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl EngineConfig {
    pub fn new(api_key: String, model: String, base_url: String) -> Result<Self, AppError> {
        if api_key.trim().is_empty() {
            return Err(AppError::Config(
                "OpenAI API key is required. Set OPENAI_API_KEY environment variable.".into(),
            ));
        }
        Ok(Self {
            api_key,
            model,
            base_url,
        })
    }

    /// Load configuration from the environment (after an optional `.env`
    /// load by the caller). `OPENAI_API_KEY` is required; model and base URL
    /// have defaults matching the hosted OpenAI API.
    pub fn from_env() -> Result<Self, AppError> {
        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(api_key, model, base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_api_key_rejected() {
        let err = EngineConfig::new(
            "  ".into(),
            DEFAULT_MODEL.into(),
            DEFAULT_BASE_URL.into(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_explicit_config_accepted() {
        let cfg = EngineConfig::new("sk-test".into(), "gpt-4".into(), "http://localhost".into())
            .unwrap();
        assert_eq!(cfg.model, "gpt-4");
        assert_eq!(cfg.base_url, "http://localhost");
    }
}
