// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
///
/// Only orchestration-level problems surface as `AppError`. A failing target
/// is never an error: it is recorded as a `VerificationResult`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Discovery error: {0}")]
    Discovery(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
