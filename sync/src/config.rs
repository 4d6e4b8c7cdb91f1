//! Sync configuration.

use std::time::Duration;

/// Configuration for the sync coordinator.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Interval between automatic syncs, and the staleness threshold for
    /// wake/foreground/reachability triggers.
    pub sync_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(30 * 60),
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(interval) = std::env::var("TALLY_SYNC_INTERVAL_SECS") {
            if let Ok(secs) = interval.parse() {
                config.sync_interval = Duration::from_secs(secs);
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.sync_interval < Duration::from_secs(1) {
            return Err("sync interval must be at least one second".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        assert!(SyncConfig::default().validate().is_ok());
    }

    #[test]
    fn test_subsecond_interval_rejected() {
        let config = SyncConfig {
            sync_interval: Duration::from_millis(10),
        };
        assert!(config.validate().is_err());
    }
}
