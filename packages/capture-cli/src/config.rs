use anyhow::{Context, Result};
use convo_capture::SyncConfig;
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_STORE_PATH: &str = "capture-store.json";

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub sync: SyncConfig,
    pub store_path: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let mut sync = SyncConfig::default();
        if let Ok(url) = env::var("CAPTURE_API_URL") {
            sync = sync.with_api_url(url);
        }
        if let Ok(flag) = env::var("CAPTURE_AUTO_SYNC") {
            sync = sync.with_auto_sync(parse_flag(&flag).context("CAPTURE_AUTO_SYNC must be true or false")?);
        }
        if let Ok(secs) = env::var("CAPTURE_AUTO_EXTRACT_DELAY_SECS") {
            let secs: u64 = secs
                .parse()
                .context("CAPTURE_AUTO_EXTRACT_DELAY_SECS must be a valid number")?;
            sync = sync.with_auto_extract_delay(Duration::from_secs(secs));
        }
        if let Ok(secs) = env::var("CAPTURE_PROVIDER_REFRESH_SECS") {
            let secs: u64 = secs
                .parse()
                .context("CAPTURE_PROVIDER_REFRESH_SECS must be a valid number")?;
            sync = sync.with_provider_refresh(Duration::from_secs(secs));
        }

        Ok(Self {
            sync,
            store_path: env::var("CAPTURE_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_STORE_PATH)),
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
