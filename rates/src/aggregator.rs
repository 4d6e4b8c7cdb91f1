//! Multi-source rate aggregation.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use tally_common::{
    now, pair_key, AveragedRate, CancelFlag, Currency, ExchangeRate, RateSource, Timestamp,
};

use crate::config::AggregatorConfig;
use crate::error::{RatesError, RatesResult};
use crate::table::RateTable;

/// Status code the endpoint embeds in a healthy payload.
pub const STATUS_SUCCESS: i64 = 0;

/// Seam over the payload fetch so tests can inject counting or failing
/// fetchers.
#[async_trait]
pub trait PayloadFetcher: Send + Sync {
    /// Fetch the raw payload bytes.
    async fn fetch(&self) -> RatesResult<Vec<u8>>;
}

/// Production fetcher: one HTTP GET against the rate endpoint.
pub struct HttpFetcher {
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

impl HttpFetcher {
    pub fn new(endpoint: &str, timeout: std::time::Duration) -> RatesResult<Self> {
        let endpoint = reqwest::Url::parse(endpoint)
            .map_err(|e| RatesError::Configuration(format!("bad endpoint: {}", e)))?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl PayloadFetcher for HttpFetcher {
    async fn fetch(&self) -> RatesResult<Vec<u8>> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await?
            .error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Broadcast whenever a refresh commits new rates.
#[derive(Debug, Clone)]
pub struct RatesUpdated {
    pub source_count: usize,
    pub pair_count: usize,
    pub at: Timestamp,
}

/// Fetches the multi-source rate payload, validates it, and populates the
/// [`RateTable`] with per-source lists plus the cross-source averaged map.
///
/// A single in-flight guard makes concurrent `refresh` calls no-ops; the
/// last successful payload is persisted so a restart can warm the cache
/// before the first fetch completes.
pub struct RateAggregator {
    fetcher: Arc<dyn PayloadFetcher>,
    table: Arc<RateTable>,
    cache_path: PathBuf,
    refreshing: AtomicBool,
    events: broadcast::Sender<RatesUpdated>,
}

impl RateAggregator {
    pub fn new(
        fetcher: Arc<dyn PayloadFetcher>,
        table: Arc<RateTable>,
        cache_path: PathBuf,
    ) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            fetcher,
            table,
            cache_path,
            refreshing: AtomicBool::new(false),
            events,
        }
    }

    /// Build an aggregator with the production HTTP fetcher.
    pub fn from_config(config: AggregatorConfig, table: Arc<RateTable>) -> RatesResult<Self> {
        config.validate().map_err(RatesError::Configuration)?;
        let fetcher = HttpFetcher::new(&config.endpoint, config.request_timeout)?;
        Ok(Self::new(Arc::new(fetcher), table, config.cache_path))
    }

    /// The table this aggregator populates.
    pub fn table(&self) -> &Arc<RateTable> {
        &self.table
    }

    /// Subscribe to refresh notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<RatesUpdated> {
        self.events.subscribe()
    }

    /// Refresh rates from the endpoint.
    ///
    /// Returns immediately with `Ok` if a refresh is already in flight.
    pub async fn refresh(&self) -> RatesResult<()> {
        self.refresh_with(None).await
    }

    /// Refresh with a cancellation flag; a canceled generation's payload is
    /// discarded before any table mutation or persistence.
    #[instrument(skip_all)]
    pub async fn refresh_with(&self, cancel: Option<&CancelFlag>) -> RatesResult<()> {
        if self
            .refreshing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("refresh requested while already refreshing, skipping");
            return Ok(());
        }

        let result = self.refresh_inner(cancel).await;
        self.refreshing.store(false, Ordering::SeqCst);
        result
    }

    async fn refresh_inner(&self, cancel: Option<&CancelFlag>) -> RatesResult<()> {
        debug!("refreshing exchange rates");
        let bytes = self.fetcher.fetch().await?;

        if cancel.is_some_and(CancelFlag::is_canceled) {
            debug!("refresh canceled, discarding payload");
            return Ok(());
        }

        self.apply_payload(&bytes)?;

        if let Err(error) = self.persist(&bytes).await {
            warn!(error = %error, "failed to persist exchange rates");
        }

        let snapshot = self.table.snapshot();
        let updated = RatesUpdated {
            source_count: snapshot.per_source.len(),
            pair_count: snapshot.averaged.len(),
            at: snapshot.refreshed_at.unwrap_or_else(now),
        };
        info!(
            sources = updated.source_count,
            pairs = updated.pair_count,
            "exchange rates updated"
        );
        let _ = self.events.send(updated);

        Ok(())
    }

    /// Parse a payload and commit it to the table.
    ///
    /// Sources absent from the payload keep their previous lists; the
    /// averaged map is rebuilt wholesale over the merged lists. Failure
    /// leaves the table untouched.
    pub fn apply_payload(&self, bytes: &[u8]) -> RatesResult<()> {
        let parsed = parse_payload(bytes)?;

        let previous = self.table.snapshot();
        let mut merged = previous.per_source.clone();
        for (source, rates) in parsed {
            merged.insert(source, rates);
        }

        let averaged = build_averaged(&merged);
        self.table.commit_refresh(merged, averaged, now());
        Ok(())
    }

    /// Warm the table from the persisted payload, if one exists.
    ///
    /// A missing or stale file is expected on first launch; callers treat
    /// failure as "start empty".
    pub fn load_cached(&self) -> RatesResult<()> {
        let bytes = std::fs::read(&self.cache_path)?;
        self.apply_payload(&bytes)?;
        info!(pairs = self.table.pair_count(), "warmed rates from disk");
        Ok(())
    }

    async fn persist(&self, bytes: &[u8]) -> RatesResult<()> {
        let tmp = self.cache_path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.cache_path).await?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct SourcePayload {
    rates: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct RawRate {
    from: String,
    to: String,
    rate: f64,
}

/// Decode the wire payload into per-source rate lists.
///
/// Top-level keys that are not known source ids are skipped, as are
/// entries that are missing fields or carry a non-positive rate. A payload
/// that is not an object, lacks a status code, or reports a non-success
/// code is a hard failure.
pub fn parse_payload(bytes: &[u8]) -> RatesResult<HashMap<RateSource, Vec<ExchangeRate>>> {
    let value: serde_json::Value = serde_json::from_slice(bytes)?;
    let object = value
        .as_object()
        .ok_or(RatesError::MalformedPayload("top level is not an object"))?;

    let code = object
        .get("code")
        .and_then(serde_json::Value::as_i64)
        .ok_or(RatesError::MalformedPayload("missing status code"))?;
    if code != STATUS_SUCCESS {
        return Err(RatesError::ServerStatus { code });
    }

    let mut lists = HashMap::new();
    for (key, value) in object {
        if key == "code" {
            continue;
        }

        let Some(source) = key.parse::<i64>().ok().and_then(RateSource::from_wire_id) else {
            debug!(key = %key, "skipping unknown rate source");
            continue;
        };

        let Ok(payload) = serde_json::from_value::<SourcePayload>(value.clone()) else {
            debug!(source = %source, "skipping source without a rate list");
            continue;
        };

        let mut rates = Vec::with_capacity(payload.rates.len());
        for entry in payload.rates {
            let Ok(raw) = serde_json::from_value::<RawRate>(entry) else {
                continue;
            };
            if !raw.rate.is_finite() || raw.rate <= 0.0 {
                continue;
            }
            rates.push(ExchangeRate::new(
                source,
                Currency::from_code(&raw.from),
                Currency::from_code(&raw.to),
                raw.rate,
            ));
        }

        if !rates.is_empty() {
            lists.insert(source, rates);
        }
    }

    Ok(lists)
}

/// Build the averaged map over every pair observed in any source.
///
/// Processing order is deterministic: sources in registry order, entries
/// in payload order. The first write for a forward key wins and each
/// forward write materializes its exact reciprocal, so both directions of
/// a pair always agree.
pub fn build_averaged(
    per_source: &HashMap<RateSource, Vec<ExchangeRate>>,
) -> HashMap<String, AveragedRate> {
    let all: Vec<&ExchangeRate> = RateSource::all()
        .iter()
        .filter_map(|source| per_source.get(source))
        .flatten()
        .collect();

    let mut averaged = HashMap::new();
    for source in RateSource::all() {
        let Some(list) = per_source.get(&source) else {
            continue;
        };
        for rate in list {
            let key = pair_key(&rate.from, &rate.to);
            if averaged.contains_key(&key) {
                continue;
            }

            let matching: Vec<f64> = all
                .iter()
                .filter(|r| r.from == rate.from && r.to == rate.to)
                .map(|r| r.rate)
                .collect();
            let mean = matching.iter().sum::<f64>() / matching.len() as f64;

            let forward = AveragedRate::new(rate.from.clone(), rate.to.clone(), mean);
            let inverse = forward.inverse();
            averaged.insert(inverse.key(), inverse);
            averaged.insert(key, forward);
        }
    }

    averaged
}
