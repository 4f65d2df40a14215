//! Resolves the active descriptor set: backend, then cache, then built-ins.

use chrono::Utc;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{BackendError, StoreResult};
use crate::providers::builtin::{builtin_descriptors, builtin_registry, BUILTIN_VERSION};
use crate::providers::registry::ProviderRegistry;
use crate::providers::transport::{decode_descriptors, StrategyRegistry};
use crate::traits::backend::HistoryBackend;
use crate::traits::store::KeyValueStore;

pub const PROVIDER_CACHE_KEY: &str = "dom_provider_configs";
pub const PROVIDER_VERSION_KEY: &str = "dom_provider_version";
pub const PROVIDER_UPDATED_AT_KEY: &str = "dom_provider_updated_at";

/// Default age after which cached descriptors are refreshed.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Where a resolved descriptor set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Remote,
    Cache,
    Builtin,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Source::Remote => "remote",
            Source::Cache => "cache",
            Source::Builtin => "builtin",
        })
    }
}

/// A resolved descriptor set.
#[derive(Debug, Clone)]
pub struct ResolvedDescriptors {
    pub registry: ProviderRegistry,

    /// Version tag; lets callers skip redundant refreshes
    pub version: Option<String>,

    pub source: Source,
}

/// Snapshot of the descriptor cache.
#[derive(Debug, Default)]
struct CachedDescriptors {
    providers: Vec<Value>,
    version: Option<String>,
    updated_at_ms: i64,
}

/// Descriptor store over a key/value cache and the history backend.
pub struct DescriptorStore<S, B> {
    store: S,
    backend: B,
    strategies: StrategyRegistry,
    refresh_interval: Duration,
}

impl<S: KeyValueStore, B: HistoryBackend> DescriptorStore<S, B> {
    pub fn new(store: S, backend: B, strategies: StrategyRegistry) -> Self {
        Self {
            store,
            backend,
            strategies,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn strategies(&self) -> &StrategyRegistry {
        &self.strategies
    }

    /// Current descriptors, refreshing when the cache is empty or stale.
    pub async fn descriptors(&self) -> ResolvedDescriptors {
        let cached = self.load_cache().await;
        let age_ms = Utc::now().timestamp_millis() - cached.updated_at_ms;
        let stale = cached.providers.is_empty() || age_ms > self.refresh_interval.as_millis() as i64;

        if stale {
            debug!(age_ms, "Descriptor cache stale, refreshing");
            return self.refresh(false).await;
        }

        match self.resolve_values(cached.providers, cached.version, Source::Cache) {
            Some(resolved) => resolved,
            None => self.builtin(),
        }
    }

    /// Fetch descriptors from the backend, falling back to the cache and
    /// then the built-ins. Unless `force`d, an unchanged remote version
    /// keeps the cached copy.
    pub async fn refresh(&self, force: bool) -> ResolvedDescriptors {
        let cached = self.load_cache().await;

        match self.fetch_remote(force, &cached).await {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(backend = self.backend.name(), error = %e, "Failed to refresh provider descriptors");
                self.resolve_values(cached.providers, cached.version, Source::Cache)
                    .unwrap_or_else(|| self.builtin())
            }
        }
    }

    async fn fetch_remote(&self, force: bool, cached: &CachedDescriptors) -> Result<ResolvedDescriptors, BackendError> {
        let response = self.backend.fetch_providers().await?;

        let unchanged = matches!(
            (&cached.version, &response.version),
            (Some(local), Some(remote)) if local == remote
        );
        if !force && unchanged && !cached.providers.is_empty() {
            if let Some(resolved) = self.resolve_values(cached.providers.clone(), cached.version.clone(), Source::Cache) {
                debug!(version = ?resolved.version, "Remote descriptor version unchanged");
                return Ok(resolved);
            }
        }

        if response.is_empty() {
            return Err(BackendError::InvalidResponse {
                reason: "empty provider response".into(),
            });
        }

        let resolved = self
            .resolve_values(response.providers.clone(), response.version.clone(), Source::Remote)
            .ok_or_else(|| BackendError::InvalidResponse {
                reason: "no usable provider descriptors".into(),
            })?;

        if let Err(e) = self.save_cache(response.providers, response.version).await {
            warn!(error = %e, "Failed to cache provider descriptors");
        }

        info!(
            version = ?resolved.version,
            providers = resolved.registry.len(),
            "Refreshed provider descriptors"
        );
        Ok(resolved)
    }

    fn resolve_values(&self, values: Vec<Value>, version: Option<String>, source: Source) -> Option<ResolvedDescriptors> {
        if values.is_empty() {
            return None;
        }
        let descriptors = decode_descriptors(values, &self.strategies);
        if descriptors.is_empty() {
            return None;
        }
        Some(ResolvedDescriptors {
            registry: ProviderRegistry::new(descriptors),
            version,
            source,
        })
    }

    fn builtin(&self) -> ResolvedDescriptors {
        info!("Using built-in provider descriptors");
        ResolvedDescriptors {
            registry: builtin_registry(&self.strategies),
            version: Some(BUILTIN_VERSION.to_string()),
            source: Source::Builtin,
        }
    }

    async fn load_cache(&self) -> CachedDescriptors {
        CachedDescriptors {
            providers: match self.read_cache_key(PROVIDER_CACHE_KEY).await {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            version: self
                .read_cache_key(PROVIDER_VERSION_KEY)
                .await
                .and_then(|v| v.as_str().map(str::to_string)),
            updated_at_ms: self
                .read_cache_key(PROVIDER_UPDATED_AT_KEY)
                .await
                .and_then(|v| v.as_i64())
                .unwrap_or(0),
        }
    }

    /// Unreadable cache entries read as absent.
    async fn read_cache_key(&self, key: &str) -> Option<Value> {
        match self.store.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read descriptor cache");
                None
            }
        }
    }

    async fn save_cache(&self, providers: Vec<Value>, version: Option<String>) -> StoreResult<()> {
        self.store.set(PROVIDER_CACHE_KEY, Value::Array(providers)).await?;
        if let Some(version) = version {
            self.store.set(PROVIDER_VERSION_KEY, Value::String(version)).await?;
        }
        self.store
            .set(PROVIDER_UPDATED_AT_KEY, Value::from(Utc::now().timestamp_millis()))
            .await
    }
}

/// The built-in descriptors in transport form, e.g. to seed a backend.
pub fn builtin_descriptor_values() -> Vec<Value> {
    builtin_descriptors()
        .into_iter()
        .filter_map(|d| serde_json::to_value(d).ok())
        .collect()
}
