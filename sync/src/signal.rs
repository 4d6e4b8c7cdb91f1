//! Connectivity and app-lifecycle signals.

/// Platform signals the coordinator reacts to.
///
/// The platform glue (reachability monitor, app delegate) feeds these into
/// [`crate::SyncCoordinator::run_signal_loop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppSignal {
    /// The machine woke from sleep.
    DidWake,
    /// The app returned to the foreground.
    DidEnterForeground,
    /// Network connectivity came back.
    NetworkReachable,
    /// Network connectivity was lost.
    NetworkUnreachable,
}

/// Current-connectivity provider.
pub trait Connectivity: Send + Sync {
    fn is_reachable(&self) -> bool;
}

/// Connectivity stub for environments without a reachability monitor.
pub struct AlwaysReachable;

impl Connectivity for AlwaysReachable {
    fn is_reachable(&self) -> bool {
        true
    }
}
