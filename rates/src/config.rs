//! Aggregator configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the rate aggregator.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Rate endpoint URL.
    pub endpoint: String,
    /// Where the last successful payload is persisted.
    pub cache_path: PathBuf,
    /// HTTP request timeout.
    pub request_timeout: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://rates.tally.money/exchangeRates".to_string(),
            cache_path: PathBuf::from("current-exchange-rates.json"),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl AggregatorConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(endpoint) = std::env::var("TALLY_RATES_URL") {
            config.endpoint = endpoint;
        }

        if let Ok(path) = std::env::var("TALLY_RATES_CACHE") {
            config.cache_path = PathBuf::from(path);
        }

        if let Ok(timeout) = std::env::var("TALLY_RATES_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                config.request_timeout = Duration::from_secs(secs);
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.endpoint.is_empty() {
            return Err("endpoint cannot be empty".to_string());
        }

        if reqwest::Url::parse(&self.endpoint).is_err() {
            return Err(format!("endpoint is not a valid URL: {}", self.endpoint));
        }

        if self.cache_path.as_os_str().is_empty() {
            return Err("cache path cannot be empty".to_string());
        }

        if self.request_timeout.is_zero() {
            return Err("request timeout cannot be zero".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AggregatorConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_endpoint() {
        let mut config = AggregatorConfig::default();
        config.endpoint = "not a url".to_string();
        assert!(config.validate().is_err());
    }
}
