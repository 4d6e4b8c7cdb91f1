//! Exchange-rate sources and rate types.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::currency::Currency;

/// Origin of exchange-rate data.
///
/// Concrete variants map to the wire ids the rate endpoint publishes under.
/// `Average` is synthetic: it is computed across sources on read and never
/// stored or parsed from the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RateSource {
    Average,
    CoinbaseGdax,
    Poloniex,
    Bitfinex,
    Kraken,
    Fixer,
}

impl RateSource {
    /// All concrete sources, in the order aggregation processes them.
    pub fn all() -> [RateSource; 5] {
        [
            RateSource::CoinbaseGdax,
            RateSource::Poloniex,
            RateSource::Bitfinex,
            RateSource::Kraken,
            RateSource::Fixer,
        ]
    }

    /// Resolve a wire id to a concrete source. Unknown ids are `None` so
    /// new server-side sources degrade to a skip, not a failure.
    pub fn from_wire_id(id: i64) -> Option<RateSource> {
        match id {
            1 => Some(RateSource::CoinbaseGdax),
            2 => Some(RateSource::Poloniex),
            3 => Some(RateSource::Bitfinex),
            4 => Some(RateSource::Kraken),
            5 => Some(RateSource::Fixer),
            _ => None,
        }
    }

    /// The wire id for a concrete source.
    pub fn wire_id(&self) -> Option<i64> {
        match self {
            RateSource::Average => None,
            RateSource::CoinbaseGdax => Some(1),
            RateSource::Poloniex => Some(2),
            RateSource::Bitfinex => Some(3),
            RateSource::Kraken => Some(4),
            RateSource::Fixer => Some(5),
        }
    }

    /// Bridge currencies tried, in order, when no direct rate exists for a
    /// pair and conversion has to hop through an intermediate.
    pub fn bridge_currencies() -> Vec<Currency> {
        vec![
            Currency::usd(),
            Currency::eur(),
            Currency::btc(),
            Currency::eth(),
        ]
    }

    /// Preferred crypto anchor for the last-resort conversion chain.
    pub fn primary_crypto_bridge() -> Currency {
        Currency::btc()
    }

    /// Preferred fiat anchor for the last-resort conversion chain.
    pub fn primary_fiat_bridge() -> Currency {
        Currency::usd()
    }
}

impl fmt::Display for RateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RateSource::Average => "average",
            RateSource::CoinbaseGdax => "coinbase-gdax",
            RateSource::Poloniex => "poloniex",
            RateSource::Bitfinex => "bitfinex",
            RateSource::Kraken => "kraken",
            RateSource::Fixer => "fixer",
        };
        write!(f, "{}", name)
    }
}

/// Composite "FROM-TO" key for the averaged-rate map.
pub fn pair_key(from: &Currency, to: &Currency) -> String {
    pair_key_codes(from.code(), to.code())
}

/// Composite key from raw codes, for callers that alias the from side.
pub fn pair_key_codes(from: &str, to: &str) -> String {
    format!("{}-{}", from, to)
}

/// A directional exchange rate from one source: 1 unit of `from` buys
/// `rate` units of `to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub source: RateSource,
    pub from: Currency,
    pub to: Currency,
    pub rate: f64,
}

impl ExchangeRate {
    pub fn new(source: RateSource, from: Currency, to: Currency, rate: f64) -> Self {
        Self {
            source,
            from,
            to,
            rate,
        }
    }

    pub fn pair_key(&self) -> String {
        pair_key(&self.from, &self.to)
    }
}

impl fmt::Display for ExchangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}-{} {}", self.source, self.from, self.to, self.rate)
    }
}

/// Cross-source mean rate for one pair. Built during aggregation together
/// with its materialized inverse, so both directions are O(1) lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AveragedRate {
    pub from: Currency,
    pub to: Currency,
    pub rate: f64,
}

impl AveragedRate {
    pub fn new(from: Currency, to: Currency, rate: f64) -> Self {
        Self { from, to, rate }
    }

    pub fn key(&self) -> String {
        pair_key(&self.from, &self.to)
    }

    /// The reciprocal pair.
    pub fn inverse(&self) -> AveragedRate {
        AveragedRate {
            from: self.to.clone(),
            to: self.from.clone(),
            rate: 1.0 / self.rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_id_round_trip() {
        for source in RateSource::all() {
            let id = source.wire_id().unwrap();
            assert_eq!(RateSource::from_wire_id(id), Some(source));
        }
    }

    #[test]
    fn test_unknown_wire_id() {
        assert_eq!(RateSource::from_wire_id(0), None);
        assert_eq!(RateSource::from_wire_id(99), None);
    }

    #[test]
    fn test_average_has_no_wire_id() {
        assert_eq!(RateSource::Average.wire_id(), None);
    }

    #[test]
    fn test_pair_key_format() {
        assert_eq!(pair_key(&Currency::btc(), &Currency::usd()), "BTC-USD");
    }

    #[test]
    fn test_averaged_rate_inverse() {
        let rate = AveragedRate::new(Currency::btc(), Currency::usd(), 2.5);
        let inverse = rate.inverse();
        assert_eq!(inverse.key(), "USD-BTC");
        assert!((inverse.rate - 0.4).abs() < 1e-12);
    }
}
