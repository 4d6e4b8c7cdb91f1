//! Concurrent exchange-rate table.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tally_common::{AveragedRate, ExchangeRate, RateSource, Timestamp};
use tracing::debug;

/// One immutable view of the table.
///
/// `per_source` holds each source's raw rate list; `averaged` holds the
/// flattened cross-source mean map keyed by "FROM-TO". Both are replaced
/// together on refresh, so a snapshot is always internally consistent.
#[derive(Debug, Default)]
pub struct RateTableSnapshot {
    pub per_source: HashMap<RateSource, Vec<ExchangeRate>>,
    pub averaged: HashMap<String, AveragedRate>,
    pub refreshed_at: Option<Timestamp>,
}

/// Copy-on-write rate store.
///
/// Readers take an `Arc` snapshot and never block on a writer longer than
/// the pointer swap; writers build a fresh snapshot and swap it in whole.
#[derive(Debug, Default)]
pub struct RateTable {
    inner: RwLock<Arc<RateTableSnapshot>>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot. Holds no lock beyond the clone of the `Arc`.
    pub fn snapshot(&self) -> Arc<RateTableSnapshot> {
        self.inner.read().clone()
    }

    /// Replace the entire rate list for one source, leaving the averaged
    /// map untouched.
    pub fn set(&self, source: RateSource, rates: Vec<ExchangeRate>) {
        let mut guard = self.inner.write();
        let mut next = RateTableSnapshot {
            per_source: guard.per_source.clone(),
            averaged: guard.averaged.clone(),
            refreshed_at: guard.refreshed_at,
        };
        next.per_source.insert(source, rates);
        *guard = Arc::new(next);
    }

    /// Atomically swap in the result of a successful refresh.
    ///
    /// Averaged pairs absent from `averaged` vanish; there is no merge with
    /// the previous map.
    pub fn commit_refresh(
        &self,
        per_source: HashMap<RateSource, Vec<ExchangeRate>>,
        averaged: HashMap<String, AveragedRate>,
        refreshed_at: Timestamp,
    ) {
        let next = Arc::new(RateTableSnapshot {
            per_source,
            averaged,
            refreshed_at: Some(refreshed_at),
        });
        *self.inner.write() = next;
        debug!(pairs = self.pair_count(), "rate table replaced");
    }

    /// Atomically swap the averaged map, leaving per-source lists as they
    /// are. Readers never observe a partially updated map.
    pub fn replace_all_averaged(&self, averaged: HashMap<String, AveragedRate>) {
        let mut guard = self.inner.write();
        let next = RateTableSnapshot {
            per_source: guard.per_source.clone(),
            averaged,
            refreshed_at: guard.refreshed_at,
        };
        *guard = Arc::new(next);
    }

    /// Raw rates for one source, if any.
    pub fn rates_for(&self, source: RateSource) -> Option<Vec<ExchangeRate>> {
        self.snapshot().per_source.get(&source).cloned()
    }

    /// Every raw rate across all sources.
    pub fn all_rates(&self) -> Vec<ExchangeRate> {
        self.snapshot()
            .per_source
            .values()
            .flatten()
            .cloned()
            .collect()
    }

    /// Snapshot of the source → rates mapping.
    pub fn by_source(&self) -> HashMap<RateSource, Vec<ExchangeRate>> {
        self.snapshot().per_source.clone()
    }

    /// O(1) averaged-rate lookup by "FROM-TO" key.
    pub fn averaged(&self, key: &str) -> Option<AveragedRate> {
        self.snapshot().averaged.get(key).cloned()
    }

    /// Number of averaged pairs (inverses included).
    pub fn pair_count(&self) -> usize {
        self.snapshot().averaged.len()
    }

    pub fn is_empty(&self) -> bool {
        let snapshot = self.snapshot();
        snapshot.per_source.is_empty() && snapshot.averaged.is_empty()
    }

    /// When the last successful refresh was committed.
    pub fn last_refreshed(&self) -> Option<Timestamp> {
        self.snapshot().refreshed_at
    }
}
