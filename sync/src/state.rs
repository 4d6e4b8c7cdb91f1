//! Sync state definitions.

use tally_common::Timestamp;

/// Where the coordinator is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    /// No cycle in flight.
    #[default]
    Idle,
    /// A cycle is running.
    Syncing,
    /// A cycle was canceled and its sub-syncs are unwinding.
    Canceled,
}

impl SyncPhase {
    pub fn is_syncing(&self) -> bool {
        matches!(self, SyncPhase::Syncing)
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, SyncPhase::Canceled)
    }
}

/// Coordinator bookkeeping, mutated only through the coordinator's own
/// entry points.
#[derive(Debug, Clone, Default)]
pub struct SyncState {
    pub phase: SyncPhase,
    /// When the last cycle finished, successful or not.
    pub last_sync: Option<Timestamp>,
    /// When the last fully successful cycle finished.
    pub last_successful_sync: Option<Timestamp>,
}
