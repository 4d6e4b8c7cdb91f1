//! The credential-provider capability.

use chrono::Utc;
use tally_common::SourceId;

use crate::error::CredentialsResult;

/// The parts of an API request that participate in its signature.
#[derive(Debug, Clone)]
pub struct SignRequest<'a> {
    /// HTTP method, e.g. "GET".
    pub method: &'a str,
    /// Request path including any query string.
    pub path: &'a str,
    /// Request body, if any.
    pub body: Option<&'a str>,
    /// Unix timestamp in seconds; doubles as the nonce where the exchange
    /// requires one.
    pub timestamp: f64,
}

impl<'a> SignRequest<'a> {
    pub fn new(method: &'a str, path: &'a str) -> Self {
        Self {
            method,
            path,
            body: None,
            timestamp: unix_now(),
        }
    }

    pub fn with_body(mut self, body: &'a str) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Current unix time in fractional seconds.
pub fn unix_now() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Signs API requests for one exchange.
///
/// Providers hold decoded key material and never expose or log it.
pub trait CredentialProvider: Send + Sync {
    /// The account source this provider authenticates.
    fn source(&self) -> SourceId;

    /// Produce the auth headers for a request.
    fn auth_headers(&self, request: &SignRequest<'_>) -> CredentialsResult<Vec<(String, String)>>;
}
