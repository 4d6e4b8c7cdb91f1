//! Sync collaborator seams.

use async_trait::async_trait;
use tally_common::{CancelFlag, SourceId, Timestamp};

use crate::error::SyncResult;

/// A per-source account/transaction fetcher.
///
/// Implementations own their credentials and storage; the coordinator only
/// fans out to them, collects their errors, and hands them the cycle's
/// cancellation flag. Long-running work should check the flag between
/// requests and return early without mutating state once it is set.
#[async_trait]
pub trait AccountSource: Send + Sync {
    fn id(&self) -> SourceId;

    async fn sync(&self, cancel: &CancelFlag) -> SyncResult<()>;
}

/// Optional purchase-receipt revalidation hook, run on full syncs when
/// requested.
#[async_trait]
pub trait ReceiptValidator: Send + Sync {
    async fn validate(&self) -> SyncResult<()>;
}

/// Outcome of a source's most recent sync attempt.
#[derive(Debug, Clone)]
pub struct SourceStatus {
    pub last_attempt: Timestamp,
    pub succeeded: bool,
    pub last_error: Option<String>,
}
