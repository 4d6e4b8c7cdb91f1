//! Sync-cycle orchestration.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use tally_common::{now, CancelFlag, SourceId};
use tally_rates::RateAggregator;

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::events::SyncEvent;
use crate::signal::{AppSignal, Connectivity};
use crate::source::{AccountSource, ReceiptValidator, SourceStatus};
use crate::state::{SyncPhase, SyncState};

/// Options for one sync cycle.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub user_initiated: bool,
    pub validate_receipt: bool,
    /// Sources excluded from this cycle.
    pub skip: HashSet<SourceId>,
}

impl SyncOptions {
    /// A scheduled or signal-triggered sync.
    pub fn automatic() -> Self {
        Self {
            user_initiated: false,
            validate_receipt: true,
            skip: HashSet::new(),
        }
    }

    /// A sync the user asked for explicitly.
    pub fn manual() -> Self {
        Self {
            user_initiated: true,
            ..Self::automatic()
        }
    }

    pub fn skipping(mut self, id: SourceId) -> Self {
        self.skip.insert(id);
        self
    }

    pub fn without_receipt_validation(mut self) -> Self {
        self.validate_receipt = false;
        self
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::automatic()
    }
}

/// What one sync cycle produced.
#[derive(Debug)]
pub struct SyncOutcome {
    /// True when every participating sub-sync succeeded and the cycle was
    /// not canceled. Guard rejections (already syncing, offline) also
    /// report success, with no errors.
    pub success: bool,
    pub canceled: bool,
    pub errors: Vec<SyncError>,
}

impl SyncOutcome {
    fn skipped() -> Self {
        Self {
            success: true,
            canceled: false,
            errors: Vec::new(),
        }
    }
}

/// One in-flight cycle's identity.
#[derive(Clone)]
struct CycleHandle {
    generation: u64,
    id: Uuid,
    cancel: CancelFlag,
}

/// Orchestrates sync cycles.
///
/// Guards against overlapping cycles, fans out to the rate aggregator and
/// every registered account source, tracks last-attempt/last-success
/// timestamps, reschedules itself on a fixed interval, and reacts to
/// connectivity and app-lifecycle signals. All state lives behind the
/// coordinator's own entry points; collaborators are injected, never
/// ambient.
pub struct SyncCoordinator {
    config: SyncConfig,
    aggregator: Arc<RateAggregator>,
    sources: Vec<Arc<dyn AccountSource>>,
    connectivity: Arc<dyn Connectivity>,
    receipt_validator: Option<Arc<dyn ReceiptValidator>>,
    state: RwLock<SyncState>,
    generation: AtomicU64,
    current: Mutex<Option<CycleHandle>>,
    source_status: DashMap<SourceId, SourceStatus>,
    pending_auto: Mutex<Option<JoinHandle<()>>>,
    events: broadcast::Sender<SyncEvent>,
    has_synced_since_launch: AtomicBool,
    weak: Weak<SyncCoordinator>,
}

impl SyncCoordinator {
    pub fn new(
        config: SyncConfig,
        aggregator: Arc<RateAggregator>,
        sources: Vec<Arc<dyn AccountSource>>,
        connectivity: Arc<dyn Connectivity>,
        receipt_validator: Option<Arc<dyn ReceiptValidator>>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(32);
        Arc::new_cyclic(|weak| Self {
            config,
            aggregator,
            sources,
            connectivity,
            receipt_validator,
            state: RwLock::new(SyncState::default()),
            generation: AtomicU64::new(0),
            current: Mutex::new(None),
            source_status: DashMap::new(),
            pending_auto: Mutex::new(None),
            events,
            has_synced_since_launch: AtomicBool::new(false),
            weak: weak.clone(),
        })
    }

    /// Run one sync cycle.
    ///
    /// Immediately reports success with no errors when a cycle is already
    /// in flight or connectivity is down.
    #[instrument(skip(self, options), fields(user_initiated = options.user_initiated))]
    pub async fn sync(&self, options: SyncOptions) -> SyncOutcome {
        if !self.connectivity.is_reachable() {
            debug!("sync requested while offline, skipping");
            return SyncOutcome::skipped();
        }

        let handle = {
            let mut state = self.state.write();
            if state.phase != SyncPhase::Idle {
                debug!("sync requested while already syncing, skipping");
                return SyncOutcome::skipped();
            }
            state.phase = SyncPhase::Syncing;
            let handle = CycleHandle {
                generation: self.generation.fetch_add(1, Ordering::SeqCst) + 1,
                id: Uuid::new_v4(),
                cancel: CancelFlag::new(),
            };
            *self.current.lock() = Some(handle.clone());
            handle
        };

        // A manual run resets the automatic cadence.
        self.cancel_pending_auto();
        self.has_synced_since_launch.store(true, Ordering::SeqCst);

        info!(sync_id = %handle.id, "starting sync cycle");
        let _ = self.events.send(SyncEvent::Started {
            sync_id: handle.id,
            user_initiated: options.user_initiated,
        });

        let mut errors = Vec::new();

        let participating: Vec<Arc<dyn AccountSource>> = self
            .sources
            .iter()
            .filter(|source| !options.skip.contains(&source.id()))
            .cloned()
            .collect();
        let source_futures = participating.into_iter().map(|source| {
            let cancel = handle.cancel.clone();
            async move { (source.id(), source.sync(&cancel).await) }
        });

        let (rates_result, source_results) = tokio::join!(
            self.aggregator.refresh_with(Some(&handle.cancel)),
            join_all(source_futures),
        );

        if let Err(error) = rates_result {
            warn!(error = %error, "exchange-rate refresh failed");
            errors.push(SyncError::Rates(error));
        }

        let attempted_at = now();
        for (id, result) in source_results {
            self.source_status.insert(
                id,
                SourceStatus {
                    last_attempt: attempted_at,
                    succeeded: result.is_ok(),
                    last_error: result.as_ref().err().map(ToString::to_string),
                },
            );
            if let Err(error) = result {
                warn!(source = %id, error = %error, "account source sync failed");
                errors.push(error);
            }
        }

        if options.validate_receipt {
            if let Some(validator) = &self.receipt_validator {
                if let Err(error) = validator.validate().await {
                    warn!(error = %error, "receipt validation failed");
                    errors.push(error);
                }
            }
        }

        // Late completions from a canceled or superseded generation must
        // not count as progress.
        let canceled = handle.cancel.is_canceled()
            || self.generation.load(Ordering::SeqCst) != handle.generation;
        let success = errors.is_empty() && !canceled;

        let finished_at = now();
        {
            let mut state = self.state.write();
            state.last_sync = Some(finished_at);
            if success {
                state.last_successful_sync = Some(finished_at);
            }
            state.phase = SyncPhase::Idle;
        }
        *self.current.lock() = None;

        info!(
            sync_id = %handle.id,
            success,
            canceled,
            error_count = errors.len(),
            "sync cycle finished"
        );
        let _ = self.events.send(SyncEvent::Completed {
            sync_id: handle.id,
            success,
            canceled,
            errors: errors.iter().map(ToString::to_string).collect(),
        });

        self.schedule_next();

        SyncOutcome {
            success,
            canceled,
            errors,
        }
    }

    /// Cancel the in-flight cycle, if any.
    ///
    /// Sub-syncs unwind cooperatively; the cycle's completion will report
    /// `canceled` and withhold the last-successful timestamp.
    pub fn cancel(&self) {
        let mut state = self.state.write();
        if state.phase != SyncPhase::Syncing {
            return;
        }
        if let Some(handle) = self.current.lock().as_ref() {
            info!(sync_id = %handle.id, "canceling in-flight sync");
            handle.cancel.cancel();
        }
        state.phase = SyncPhase::Canceled;
    }

    /// Sync now if no cycle has run this process lifetime or the last
    /// success is older than the configured interval.
    pub async fn sync_if_due(&self) -> Option<SyncOutcome> {
        if self.is_due() {
            Some(self.sync(SyncOptions::automatic()).await)
        } else {
            None
        }
    }

    /// React to a connectivity or app-lifecycle signal.
    pub async fn handle_signal(&self, signal: AppSignal) {
        debug!(?signal, "handling app signal");
        match signal {
            AppSignal::DidWake | AppSignal::DidEnterForeground | AppSignal::NetworkReachable => {
                self.sync_if_due().await;
            }
            AppSignal::NetworkUnreachable => self.cancel(),
        }
    }

    /// Drive the coordinator from a platform signal stream.
    pub async fn run_signal_loop(self: Arc<Self>, mut signals: mpsc::Receiver<AppSignal>) {
        while let Some(signal) = signals.recv().await {
            self.handle_signal(signal).await;
        }
    }

    /// Subscribe to sync lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Whether a cycle is in flight (including one that is unwinding after
    /// cancellation).
    pub fn syncing(&self) -> bool {
        self.state.read().phase != SyncPhase::Idle
    }

    /// Whether the in-flight cycle was canceled.
    pub fn canceled(&self) -> bool {
        self.state.read().phase.is_canceled()
    }

    /// Current bookkeeping snapshot.
    pub fn state(&self) -> SyncState {
        self.state.read().clone()
    }

    /// Outcome of a source's most recent sync attempt.
    pub fn source_status(&self, id: SourceId) -> Option<SourceStatus> {
        self.source_status.get(&id).map(|status| status.clone())
    }

    /// Cancel any in-flight cycle and pending automatic schedule.
    pub fn shutdown(&self) {
        self.cancel();
        self.cancel_pending_auto();
    }

    fn is_due(&self) -> bool {
        if !self.has_synced_since_launch.load(Ordering::SeqCst) {
            return true;
        }
        match self.state.read().last_successful_sync {
            None => true,
            Some(last) => {
                let elapsed = (now() - last).to_std().unwrap_or(Duration::ZERO);
                elapsed > self.config.sync_interval
            }
        }
    }

    fn schedule_next(&self) {
        let weak = self.weak.clone();
        let interval = self.config.sync_interval;
        let task = tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            if let Some(coordinator) = weak.upgrade() {
                // Detach this task's own handle first; the cycle it starts
                // must not be able to abort itself through the debounce.
                coordinator.pending_auto.lock().take();
                debug!("sync interval elapsed, starting automatic sync");
                coordinator.sync(SyncOptions::automatic()).await;
            }
        });
        if let Some(previous) = self.pending_auto.lock().replace(task) {
            previous.abort();
        }
    }

    fn cancel_pending_auto(&self) {
        if let Some(task) = self.pending_auto.lock().take() {
            task.abort();
        }
    }
}

impl Drop for SyncCoordinator {
    fn drop(&mut self) {
        if let Some(task) = self.pending_auto.lock().take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tally_rates::{PayloadFetcher, RateTable, RatesResult};

    struct TestFetcher {
        delay: Option<Duration>,
    }

    #[async_trait]
    impl PayloadFetcher for TestFetcher {
        async fn fetch(&self) -> RatesResult<Vec<u8>> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(serde_json::json!({
                "code": 0,
                "1": { "rates": [ {"from": "BTC", "to": "USD", "rate": 10_000.0} ] },
            })
            .to_string()
            .into_bytes())
        }
    }

    struct TestSource {
        id: SourceId,
        fail: bool,
        delay: Option<Duration>,
        syncs: AtomicUsize,
    }

    impl TestSource {
        fn new(id: SourceId) -> Arc<Self> {
            Arc::new(Self {
                id,
                fail: false,
                delay: None,
                syncs: AtomicUsize::new(0),
            })
        }

        fn failing(id: SourceId) -> Arc<Self> {
            Arc::new(Self {
                id,
                fail: true,
                delay: None,
                syncs: AtomicUsize::new(0),
            })
        }

        fn slow(id: SourceId, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                id,
                fail: false,
                delay: Some(delay),
                syncs: AtomicUsize::new(0),
            })
        }

        fn sync_count(&self) -> usize {
            self.syncs.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AccountSource for TestSource {
        fn id(&self) -> SourceId {
            self.id
        }

        async fn sync(&self, cancel: &CancelFlag) -> crate::SyncResult<()> {
            self.syncs.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if cancel.is_canceled() {
                return Ok(());
            }
            if self.fail {
                return Err(SyncError::source(self.id, "boom"));
            }
            Ok(())
        }
    }

    struct FailingValidator;

    #[async_trait]
    impl ReceiptValidator for FailingValidator {
        async fn validate(&self) -> crate::SyncResult<()> {
            Err(SyncError::Receipt("expired".to_string()))
        }
    }

    struct Unreachable;

    impl Connectivity for Unreachable {
        fn is_reachable(&self) -> bool {
            false
        }
    }

    fn coordinator_with(
        sources: Vec<Arc<dyn AccountSource>>,
        connectivity: Arc<dyn Connectivity>,
        receipt_validator: Option<Arc<dyn ReceiptValidator>>,
        fetch_delay: Option<Duration>,
    ) -> (Arc<SyncCoordinator>, Arc<RateTable>, tempfile::TempDir) {
        let table = Arc::new(RateTable::new());
        let dir = tempfile::tempdir().unwrap();
        let aggregator = Arc::new(RateAggregator::new(
            Arc::new(TestFetcher { delay: fetch_delay }),
            table.clone(),
            dir.path().join("rates.json"),
        ));
        let coordinator = SyncCoordinator::new(
            SyncConfig {
                sync_interval: Duration::from_secs(600),
            },
            aggregator,
            sources,
            connectivity,
            receipt_validator,
        );
        (coordinator, table, dir)
    }

    #[tokio::test]
    async fn test_successful_cycle_records_timestamps() {
        let source = TestSource::new(SourceId::Plaid);
        let (coordinator, table, _dir) =
            coordinator_with(vec![source.clone()], Arc::new(crate::signal::AlwaysReachable), None, None);
        let mut events = coordinator.subscribe();

        let outcome = coordinator.sync(SyncOptions::manual()).await;

        assert!(outcome.success);
        assert!(outcome.errors.is_empty());
        assert_eq!(source.sync_count(), 1);
        assert!(table.averaged("BTC-USD").is_some());

        let state = coordinator.state();
        assert!(state.last_sync.is_some());
        assert!(state.last_successful_sync.is_some());
        assert_eq!(state.phase, SyncPhase::Idle);

        assert!(matches!(events.try_recv().unwrap(), SyncEvent::Started { .. }));
        match events.try_recv().unwrap() {
            SyncEvent::Completed { success, canceled, .. } => {
                assert!(success);
                assert!(!canceled);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_source_failure_withholds_success_timestamp() {
        let source = TestSource::failing(SourceId::Bitfinex);
        let (coordinator, _table, _dir) =
            coordinator_with(vec![source], Arc::new(crate::signal::AlwaysReachable), None, None);

        let outcome = coordinator.sync(SyncOptions::manual()).await;

        assert!(!outcome.success);
        assert_eq!(outcome.errors.len(), 1);

        let state = coordinator.state();
        assert!(state.last_sync.is_some());
        assert!(state.last_successful_sync.is_none());

        let status = coordinator.source_status(SourceId::Bitfinex).unwrap();
        assert!(!status.succeeded);
        assert!(status.last_error.unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn test_sync_while_syncing_is_a_noop() {
        let source = TestSource::slow(SourceId::Plaid, Duration::from_millis(200));
        let (coordinator, _table, _dir) =
            coordinator_with(vec![source.clone()], Arc::new(crate::signal::AlwaysReachable), None, None);

        let background = coordinator.clone();
        let running = tokio::spawn(async move { background.sync(SyncOptions::manual()).await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(coordinator.syncing());
        let second = coordinator.sync(SyncOptions::manual()).await;
        assert!(second.success);
        assert!(second.errors.is_empty());

        let first = running.await.unwrap();
        assert!(first.success);
        assert_eq!(source.sync_count(), 1);
    }

    #[tokio::test]
    async fn test_sync_while_offline_is_a_noop() {
        let source = TestSource::new(SourceId::Plaid);
        let (coordinator, _table, _dir) =
            coordinator_with(vec![source.clone()], Arc::new(Unreachable), None, None);

        let outcome = coordinator.sync(SyncOptions::manual()).await;

        assert!(outcome.success);
        assert_eq!(source.sync_count(), 0);
        assert!(coordinator.state().last_sync.is_none());
    }

    #[tokio::test]
    async fn test_skip_excludes_sources() {
        let plaid = TestSource::new(SourceId::Plaid);
        let bitfinex = TestSource::new(SourceId::Bitfinex);
        let (coordinator, _table, _dir) = coordinator_with(
            vec![plaid.clone(), bitfinex.clone()],
            Arc::new(crate::signal::AlwaysReachable),
            None,
            None,
        );

        coordinator
            .sync(SyncOptions::manual().skipping(SourceId::Bitfinex))
            .await;

        assert_eq!(plaid.sync_count(), 1);
        assert_eq!(bitfinex.sync_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_withholds_success_even_with_late_response() {
        // Both the rate fetch and the account source resolve well after the
        // cancel lands.
        let source = TestSource::slow(SourceId::Plaid, Duration::from_millis(300));
        let (coordinator, table, _dir) = coordinator_with(
            vec![source],
            Arc::new(crate::signal::AlwaysReachable),
            None,
            Some(Duration::from_millis(300)),
        );

        let background = coordinator.clone();
        let running = tokio::spawn(async move { background.sync(SyncOptions::manual()).await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        coordinator.cancel();
        assert!(coordinator.canceled());

        let outcome = running.await.unwrap();
        assert!(outcome.canceled);
        assert!(!outcome.success);

        let state = coordinator.state();
        assert!(state.last_sync.is_some());
        assert!(state.last_successful_sync.is_none());
        assert_eq!(state.phase, SyncPhase::Idle);

        // The late rate payload was discarded, not committed.
        assert!(table.averaged("BTC-USD").is_none());
    }

    #[tokio::test]
    async fn test_cancel_when_idle_is_a_noop() {
        let (coordinator, _table, _dir) =
            coordinator_with(vec![], Arc::new(crate::signal::AlwaysReachable), None, None);
        coordinator.cancel();
        assert!(!coordinator.syncing());
        assert!(!coordinator.canceled());
    }

    #[tokio::test]
    async fn test_receipt_validation_failure_is_collected() {
        let (coordinator, _table, _dir) = coordinator_with(
            vec![],
            Arc::new(crate::signal::AlwaysReachable),
            Some(Arc::new(FailingValidator)),
            None,
        );

        let outcome = coordinator.sync(SyncOptions::manual()).await;
        assert!(!outcome.success);
        assert!(matches!(outcome.errors[0], SyncError::Receipt(_)));

        let skipped = coordinator
            .sync(SyncOptions::manual().without_receipt_validation())
            .await;
        assert!(skipped.success);
    }

    #[tokio::test]
    async fn test_unreachable_signal_cancels() {
        let source = TestSource::slow(SourceId::Plaid, Duration::from_millis(300));
        let (coordinator, _table, _dir) =
            coordinator_with(vec![source], Arc::new(crate::signal::AlwaysReachable), None, None);

        let background = coordinator.clone();
        let running = tokio::spawn(async move { background.sync(SyncOptions::manual()).await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        coordinator.handle_signal(AppSignal::NetworkUnreachable).await;

        let outcome = running.await.unwrap();
        assert!(outcome.canceled);
    }

    #[tokio::test]
    async fn test_signal_triggers_sync_when_never_synced() {
        let source = TestSource::new(SourceId::Plaid);
        let (coordinator, _table, _dir) =
            coordinator_with(vec![source.clone()], Arc::new(crate::signal::AlwaysReachable), None, None);

        coordinator.handle_signal(AppSignal::DidWake).await;
        assert_eq!(source.sync_count(), 1);

        // A fresh success within the interval means the next signal no-ops.
        coordinator.handle_signal(AppSignal::DidEnterForeground).await;
        assert_eq!(source.sync_count(), 1);
    }

    #[tokio::test]
    async fn test_automatic_resync_fires_after_interval() {
        let source = TestSource::new(SourceId::Plaid);
        let table = Arc::new(RateTable::new());
        let dir = tempfile::tempdir().unwrap();
        let aggregator = Arc::new(RateAggregator::new(
            Arc::new(TestFetcher { delay: None }),
            table,
            dir.path().join("rates.json"),
        ));
        let coordinator = SyncCoordinator::new(
            SyncConfig {
                sync_interval: Duration::from_millis(100),
            },
            aggregator,
            vec![source.clone()],
            Arc::new(crate::signal::AlwaysReachable),
            None,
        );

        coordinator.sync(SyncOptions::manual()).await;
        assert_eq!(source.sync_count(), 1);

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert!(source.sync_count() >= 2);

        coordinator.shutdown();
    }
}
