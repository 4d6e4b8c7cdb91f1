//! Rate engine error types.

use thiserror::Error;

/// Errors that can occur while refreshing or loading exchange rates.
///
/// Absence of a rate is never an error; lookups return `Option` instead.
#[derive(Debug, Error)]
pub enum RatesError {
    /// Network failure talking to the rate endpoint.
    #[error("rate endpoint request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Payload was not valid JSON.
    #[error("failed to decode rate payload: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload decoded but did not have the expected shape.
    #[error("malformed rate payload: {0}")]
    MalformedPayload(&'static str),

    /// Endpoint reported a non-success status code in the payload body.
    #[error("rate endpoint returned status code {code}")]
    ServerStatus { code: i64 },

    /// Reading or writing the persisted payload failed.
    #[error("rate cache i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration rejected at construction.
    #[error("invalid aggregator configuration: {0}")]
    Configuration(String),
}

/// Result type for rate operations.
pub type RatesResult<T> = Result<T, RatesError>;
