//! Sync error types.

use tally_common::SourceId;
use tally_rates::RatesError;
use thiserror::Error;

/// Errors collected over one sync cycle.
///
/// Individual failures never abort the cycle; they are gathered and
/// surfaced together in the outcome.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The exchange-rate refresh failed.
    #[error("rate refresh failed: {0}")]
    Rates(#[from] RatesError),

    /// One account source failed to sync.
    #[error("{id} sync failed: {message}")]
    Source { id: SourceId, message: String },

    /// Purchase-receipt revalidation failed.
    #[error("receipt validation failed: {0}")]
    Receipt(String),
}

impl SyncError {
    pub fn source(id: SourceId, message: impl Into<String>) -> Self {
        SyncError::Source {
            id,
            message: message.into(),
        }
    }
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
