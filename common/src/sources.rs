//! Account-data source identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An origin of account and transaction data, synced independently of the
/// exchange-rate feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceId {
    Plaid,
    CoinbaseGdax,
    Poloniex,
    Bitfinex,
}

impl SourceId {
    pub fn all() -> [SourceId; 4] {
        [
            SourceId::Plaid,
            SourceId::CoinbaseGdax,
            SourceId::Poloniex,
            SourceId::Bitfinex,
        ]
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceId::Plaid => "plaid",
            SourceId::CoinbaseGdax => "coinbase-gdax",
            SourceId::Poloniex => "poloniex",
            SourceId::Bitfinex => "bitfinex",
        };
        write!(f, "{}", name)
    }
}
