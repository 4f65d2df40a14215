//! Configuration for the sync flow.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default history backend base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/v1";

/// Configuration for syncing captured conversations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Base URL of the history backend, without trailing slash.
    pub api_url: String,

    /// Push to the backend immediately after every save.
    ///
    /// When false, records are only persisted locally until an explicit
    /// sync. Default: false.
    pub auto_sync: bool,

    /// Seconds to wait after page load before auto extraction.
    ///
    /// Chat pages render their transcript lazily. Default: 3.
    pub auto_extract_delay_secs: u64,

    /// Seconds before cached provider descriptors are considered stale.
    ///
    /// Default: 1800 (30 minutes).
    pub provider_refresh_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            auto_sync: false,
            auto_extract_delay_secs: 3,
            provider_refresh_secs: 30 * 60,
        }
    }
}

impl SyncConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the backend base URL.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Enable or disable pushing after every save.
    pub fn with_auto_sync(mut self, enabled: bool) -> Self {
        self.auto_sync = enabled;
        self
    }

    /// Set the auto extraction delay.
    pub fn with_auto_extract_delay(mut self, delay: Duration) -> Self {
        self.auto_extract_delay_secs = delay.as_secs();
        self
    }

    /// Set the provider refresh interval.
    pub fn with_provider_refresh(mut self, interval: Duration) -> Self {
        self.provider_refresh_secs = interval.as_secs();
        self
    }

    pub fn auto_extract_delay(&self) -> Duration {
        Duration::from_secs(self.auto_extract_delay_secs)
    }

    pub fn provider_refresh(&self) -> Duration {
        Duration::from_secs(self.provider_refresh_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_config_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.api_url, "http://localhost:8000/v1");
        assert!(!config.auto_sync);
        assert_eq!(config.auto_extract_delay(), Duration::from_secs(3));
        assert_eq!(config.provider_refresh(), Duration::from_secs(1800));
    }

    #[test]
    fn test_sync_config_builder() {
        let config = SyncConfig::new()
            .with_api_url("https://history.example.com/v1/")
            .with_auto_sync(true)
            .with_auto_extract_delay(Duration::from_secs(5))
            .with_provider_refresh(Duration::from_secs(60));

        assert_eq!(config.api_url, "https://history.example.com/v1");
        assert!(config.auto_sync);
        assert_eq!(config.auto_extract_delay_secs, 5);
        assert_eq!(config.provider_refresh_secs, 60);
    }
}
