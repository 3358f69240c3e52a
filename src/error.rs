/// Crate-wide error type. Every fallible function returns `Result<T, AppError>`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A test-result record carried an unrecognized status value.
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// The model response was not valid JSON (after best-effort recovery)
    /// or did not match the requested shape.
    #[error("Model response invalid: {0}")]
    ModelResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Missing or unusable configuration (API key, base URL). Raised before
    /// any network call is made.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Stable machine-readable discriminant for log fields and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::MalformedRecord(_) => "malformed_record",
            AppError::ModelResponse(_) => "model_response",
            AppError::Io(_) => "io",
            AppError::Serde(_) => "serde",
            AppError::Http(_) => "http",
            AppError::Config(_) => "config",
            AppError::Validation(_) => "validation",
        }
    }
}
