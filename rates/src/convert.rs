//! Currency conversion over the rate table.

use std::sync::Arc;

use tracing::trace;

use tally_common::{pair_key, pair_key_codes, Currency, RateSource};

use crate::table::{RateTable, RateTableSnapshot};

/// Resolves conversion factors between arbitrary currency pairs.
///
/// Resolution order, first match wins: identity, the requested source's own
/// rates (direct, then reciprocal), every concrete source (direct,
/// reciprocal, then a two-hop route through each bridge currency within
/// that source), and finally the cross-source averaged table. Absence of a
/// rate is a normal outcome, not an error.
pub struct CurrencyConverter {
    table: Arc<RateTable>,
}

impl CurrencyConverter {
    pub fn new(table: Arc<RateTable>) -> Self {
        Self { table }
    }

    /// Convert `amount` units of `from` into `to`.
    pub fn convert(
        &self,
        amount: f64,
        from: &Currency,
        to: &Currency,
        source: RateSource,
    ) -> Option<f64> {
        if from == to {
            return Some(amount);
        }
        if source == RateSource::Average {
            return self.averaged_factor(from, to).map(|factor| amount * factor);
        }

        let snapshot = self.table.snapshot();
        if let Some(rate) = source_rate(&snapshot, from, to, source) {
            return Some(amount * rate);
        }

        for candidate in RateSource::all() {
            if let Some(rate) = source_rate(&snapshot, from, to, candidate) {
                return Some(amount * rate);
            }
            for bridge in RateSource::bridge_currencies() {
                if bridge == *from || bridge == *to {
                    continue;
                }
                let first = source_rate(&snapshot, from, &bridge, candidate);
                let second = source_rate(&snapshot, &bridge, to, candidate);
                if let (Some(first), Some(second)) = (first, second) {
                    return Some(amount * first * second);
                }
            }
        }

        trace!(%from, %to, "no per-source route, falling back to averaged table");
        self.averaged_factor(from, to).map(|factor| amount * factor)
    }

    /// Convert an integer minor-units amount, rescaling by each currency's
    /// decimal precision.
    ///
    /// The result is truncated toward zero, not rounded; callers rely on
    /// that being stable.
    pub fn convert_minor_units(
        &self,
        amount: i64,
        from: &Currency,
        to: &Currency,
        source: RateSource,
    ) -> Option<i64> {
        let fractional = amount as f64 / 10f64.powi(from.decimals() as i32);
        let converted = self.convert(fractional, from, to, source)?;
        Some((converted * 10f64.powi(to.decimals() as i32)) as i64)
    }

    /// The conversion factor for one pair, if any.
    pub fn rate(&self, from: &Currency, to: &Currency, source: RateSource) -> Option<f64> {
        if from == to {
            return Some(1.0);
        }
        if source == RateSource::Average {
            return self.averaged_factor(from, to);
        }
        source_rate(&self.table.snapshot(), from, to, source)
    }

    /// Resolve a factor through the cross-source averaged table.
    ///
    /// Tries the direct pair, then a two-hop route through each bridge
    /// currency, then the legacy preference chain: a from→BTC leg extended
    /// through BTC→USD→target, else through BTC→ETH→target. The chain
    /// ordering is relied upon and must not be rearranged.
    fn averaged_factor(&self, from: &Currency, to: &Currency) -> Option<f64> {
        if from == to {
            return Some(1.0);
        }

        let snapshot = self.table.snapshot();
        let averaged = &snapshot.averaged;
        let from_code = from.ticker_code();

        if let Some(direct) = averaged.get(&pair_key_codes(from_code, to.code())) {
            return Some(direct.rate);
        }

        for bridge in RateSource::bridge_currencies() {
            if bridge == *from || bridge == *to {
                continue;
            }
            let first = averaged.get(&pair_key_codes(from_code, bridge.code()));
            let second = averaged.get(&pair_key(&bridge, to));
            if let (Some(first), Some(second)) = (first, second) {
                return Some(first.rate * second.rate);
            }
        }

        let btc = RateSource::primary_crypto_bridge();
        let usd = RateSource::primary_fiat_bridge();
        let eth = Currency::eth();

        let to_btc = averaged.get(&pair_key_codes(from_code, btc.code()))?;
        if let (Some(btc_usd), Some(usd_to)) = (
            averaged.get(&pair_key(&btc, &usd)),
            averaged.get(&pair_key(&usd, to)),
        ) {
            return Some(to_btc.rate * btc_usd.rate * usd_to.rate);
        }
        if let (Some(btc_eth), Some(eth_to)) = (
            averaged.get(&pair_key(&btc, &eth)),
            averaged.get(&pair_key(&eth, to)),
        ) {
            return Some(to_btc.rate * btc_eth.rate * eth_to.rate);
        }

        None
    }
}

/// Direct lookup within one source's list, falling back to the reciprocal
/// pair inverted.
fn source_rate(
    snapshot: &RateTableSnapshot,
    from: &Currency,
    to: &Currency,
    source: RateSource,
) -> Option<f64> {
    let list = snapshot.per_source.get(&source)?;
    if let Some(rate) = list.iter().find(|r| r.from == *from && r.to == *to) {
        return Some(rate.rate);
    }
    list.iter()
        .find(|r| r.from == *to && r.to == *from)
        .map(|r| 1.0 / r.rate)
}
