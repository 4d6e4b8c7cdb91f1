//! Tally Sync Orchestration
//!
//! Coordinates one logical "sync cycle": refreshing exchange rates
//! alongside per-source account and transaction syncs, with overlap
//! guarding, interval-based rescheduling, connectivity awareness, and
//! cooperative cancellation.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod signal;
pub mod source;
pub mod state;

pub use config::SyncConfig;
pub use coordinator::{SyncCoordinator, SyncOptions, SyncOutcome};
pub use error::{SyncError, SyncResult};
pub use events::SyncEvent;
pub use signal::{AppSignal, Connectivity};
pub use source::{AccountSource, ReceiptValidator, SourceStatus};
pub use state::{SyncPhase, SyncState};
