pub mod config;
pub mod error;
pub mod inspector;
pub mod llm;
pub mod logging;
pub mod report;
pub mod revision;
pub mod testplan;

pub use config::EngineConfig;
pub use error::AppError;
