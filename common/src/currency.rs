//! Currency registry.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Broad currency category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurrencyKind {
    Fiat,
    Crypto,
}

/// Fiat codes the registry knows about. Everything else is treated as a
/// crypto asset, since new listings show up on exchange feeds long before
/// any registry learns about them.
const FIAT_CODES: &[&str] = &[
    "USD", "EUR", "GBP", "JPY", "CAD", "AUD", "CHF", "CNY", "SEK", "NOK", "DKK", "NZD", "SGD",
    "HKD", "KRW", "VND", "INR", "RUB", "BRL", "MXN", "ZAR", "TRY", "PLN", "BHD", "KWD", "OMR",
];

/// A currency: code, decimal precision, and fiat/crypto category.
///
/// Instances come from the fixed registry via [`Currency::from_code`] or the
/// named constructors, so equal codes always carry equal metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Currency {
    code: String,
    decimals: u32,
    kind: CurrencyKind,
}

impl Currency {
    /// Resolve a code through the registry.
    ///
    /// Known fiat codes get their ISO-style precision; everything else is a
    /// crypto asset with 8 fractional digits.
    pub fn from_code(code: impl AsRef<str>) -> Self {
        let code = code.as_ref().trim().to_uppercase();
        if FIAT_CODES.contains(&code.as_str()) {
            let decimals = fiat_decimals(&code);
            Self {
                code,
                decimals,
                kind: CurrencyKind::Fiat,
            }
        } else {
            Self {
                code,
                decimals: 8,
                kind: CurrencyKind::Crypto,
            }
        }
    }

    /// Get the currency code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Number of fractional digits for minor-unit amounts.
    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    /// Fiat or crypto.
    pub fn kind(&self) -> CurrencyKind {
        self.kind
    }

    pub fn is_fiat(&self) -> bool {
        self.kind == CurrencyKind::Fiat
    }

    pub fn is_crypto(&self) -> bool {
        self.kind == CurrencyKind::Crypto
    }

    /// The symbol this currency trades under on rate feeds.
    ///
    /// IOTA is listed as MIOTA in portfolios but the feeds publish it as
    /// IOT; averaged-table lookups go through this alias.
    pub fn ticker_code(&self) -> &str {
        match self.code.as_str() {
            "MIOTA" => "IOT",
            code => code,
        }
    }

    /// Common anchors.
    pub fn usd() -> Self {
        Self::from_code("USD")
    }

    pub fn eur() -> Self {
        Self::from_code("EUR")
    }

    pub fn gbp() -> Self {
        Self::from_code("GBP")
    }

    pub fn jpy() -> Self {
        Self::from_code("JPY")
    }

    pub fn btc() -> Self {
        Self::from_code("BTC")
    }

    pub fn eth() -> Self {
        Self::from_code("ETH")
    }
}

fn fiat_decimals(code: &str) -> u32 {
    match code {
        "JPY" | "KRW" | "VND" => 0,
        "BHD" | "KWD" | "OMR" => 3,
        _ => 2,
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

impl From<&str> for Currency {
    fn from(s: &str) -> Self {
        Self::from_code(s)
    }
}

impl Serialize for Currency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.code)
    }
}

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(Currency::from_code(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fiat_decimal_places() {
        assert_eq!(Currency::usd().decimals(), 2);
        assert_eq!(Currency::eur().decimals(), 2);
        assert_eq!(Currency::jpy().decimals(), 0);
        assert_eq!(Currency::from_code("KWD").decimals(), 3);
    }

    #[test]
    fn test_crypto_decimal_places() {
        assert_eq!(Currency::btc().decimals(), 8);
        assert_eq!(Currency::eth().decimals(), 8);
    }

    #[test]
    fn test_unknown_code_is_crypto() {
        let unknown = Currency::from_code("XYZ");
        assert!(unknown.is_crypto());
        assert_eq!(unknown.decimals(), 8);
    }

    #[test]
    fn test_code_normalization() {
        assert_eq!(Currency::from_code("usd"), Currency::usd());
        assert_eq!(Currency::from_code(" btc "), Currency::btc());
    }

    #[test]
    fn test_ticker_alias() {
        assert_eq!(Currency::from_code("MIOTA").ticker_code(), "IOT");
        assert_eq!(Currency::btc().ticker_code(), "BTC");
    }

    #[test]
    fn test_serde_round_trip() {
        let json = serde_json::to_string(&Currency::usd()).unwrap();
        assert_eq!(json, "\"USD\"");
        let back: Currency = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Currency::usd());
    }
}
