//! Tally Exchange-Rate Engine
//!
//! Aggregates exchange-rate data from multiple market-data sources into a
//! concurrent rate table and resolves conversions between arbitrary fiat
//! and crypto currencies.
//!
//! # Features
//!
//! - Single-flight rate refresh from a remote multi-source endpoint
//! - Cross-source averaging with eagerly materialized inverse rates
//! - Multi-hop conversion through bridge currencies when no direct rate
//!   exists
//! - Crash-safe persistence of the last payload for offline warm-up
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tally_common::{Currency, RateSource};
//! use tally_rates::{AggregatorConfig, CurrencyConverter, RateAggregator, RateTable};
//!
//! let table = Arc::new(RateTable::new());
//! let aggregator = RateAggregator::from_config(AggregatorConfig::default(), table.clone())?;
//! aggregator.load_cached().ok(); // warm up from disk before first fetch
//! aggregator.refresh().await?;
//!
//! let converter = CurrencyConverter::new(table);
//! let usd = converter.convert(1.0, &Currency::btc(), &Currency::usd(), RateSource::Average);
//! ```

pub mod aggregator;
pub mod config;
pub mod convert;
pub mod error;
pub mod table;

pub use aggregator::{HttpFetcher, PayloadFetcher, RateAggregator, RatesUpdated};
pub use config::AggregatorConfig;
pub use convert::CurrencyConverter;
pub use error::{RatesError, RatesResult};
pub use table::{RateTable, RateTableSnapshot};
