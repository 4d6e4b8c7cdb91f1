//! Typed sync notifications.

use uuid::Uuid;

/// Broadcast to observers as sync cycles progress.
///
/// Replaces ad-hoc notification-center broadcasts with typed payloads;
/// subscribe through [`crate::SyncCoordinator::subscribe`].
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A cycle started.
    Started {
        sync_id: Uuid,
        user_initiated: bool,
    },
    /// A cycle finished, successfully or not.
    Completed {
        sync_id: Uuid,
        success: bool,
        canceled: bool,
        /// Rendered messages for every collected error.
        errors: Vec<String>,
    },
}
