//! CLI error types

use securetoken::VerifyError;
use thiserror::Error;

/// Errors surfaced to the operator
#[derive(Error, Debug)]
pub enum CliError {
    /// Token or key set rejected by the verifier
    #[error("{}: {}", .0.category(), .0)]
    Verify(#[from] VerifyError),

    /// Configuration could not be loaded
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    /// JSON output could not be produced
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client could not be created
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl CliError {
    /// Get user-friendly suggestions for resolving the error
    pub fn suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Verify(e) if e.is_key_source_error() => vec![
                "Check network access to the key URL",
                "Use --key-url to point at an emulator or mirror",
            ],
            Self::Verify(VerifyError::Configuration(_)) | Self::Config(_) => vec![
                "Pass --project-id or set SECURETOKEN_PROJECT_ID",
                "Check the file given with --config",
            ],
            Self::Verify(VerifyError::InvalidClaims { .. }) => {
                vec!["Check --token-type and --project-id match the token's issuer"]
            }
            _ => vec![],
        }
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
