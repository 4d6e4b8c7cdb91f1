//! Credential error types.

use thiserror::Error;

/// Errors from credential construction or signing.
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// Key material was rejected at construction.
    #[error("invalid secret: {0}")]
    InvalidSecret(&'static str),

    /// Producing a signature failed.
    #[error("signing failed: {0}")]
    Signing(String),
}

/// Result type for credential operations.
pub type CredentialsResult<T> = Result<T, CredentialsError>;
