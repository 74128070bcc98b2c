//! Content-addressed OCR result cache.
//!
//! Results are keyed by a [`Fingerprint`] of the original request and stored
//! through a [`CacheBackend`]. The cache is an optimization only: with no
//! backend configured every lookup misses and every store is dropped, and
//! backend failures are logged and absorbed rather than returned.
//!
//! # Backends
//!
//! - [`RedisBackend`]: shared store, selected with a `redis://` or
//!   `rediss://` URL. Entries are written with `SET key value EX ttl`.
//! - [`MemoryBackend`]: per-process LRU with expiry, selected with `memory://`.

mod fingerprint;
mod memory;
mod redis_store;

pub use fingerprint::Fingerprint;
pub use memory::MemoryBackend;
pub use redis_store::RedisBackend;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::error::Result;

/// Key-value store with atomic set-with-expiry.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` so that it expires after `ttl`, in a single operation.
    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    fn name(&self) -> &'static str;
}

#[derive(Clone, Default)]
pub struct ResultCache {
    backend: Option<Arc<dyn CacheBackend>>,
}

impl ResultCache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// A cache that never hits and never stores.
    pub fn disabled() -> Self {
        Self { backend: None }
    }

    /// Build the cache described by `config`. Any problem reaching the
    /// backend leaves the cache disabled.
    pub async fn connect(config: &CacheConfig) -> Self {
        let Some(url) = config.url.as_deref() else {
            info!("No cache URL configured - result caching disabled");
            return Self::disabled();
        };

        if url.starts_with("memory://") {
            info!(
                capacity = config.memory_capacity,
                "In-process result cache initialized"
            );
            return Self::new(Arc::new(MemoryBackend::new(config.memory_capacity)));
        }

        match RedisBackend::connect(url).await {
            Ok(backend) => {
                info!("Redis result cache initialized");
                Self::new(Arc::new(backend))
            }
            Err(e) => {
                warn!("Cache backend unavailable, continuing without cache: {}", e);
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.as_ref().map_or("disabled", |b| b.name())
    }

    pub async fn get(&self, fingerprint: &Fingerprint) -> Option<String> {
        let backend = self.backend.as_ref()?;

        match backend.get(&fingerprint.cache_key()).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(%fingerprint, "Cache lookup failed, treating as miss: {}", e);
                None
            }
        }
    }

    pub async fn set(&self, fingerprint: &Fingerprint, text: &str, ttl: Duration) {
        let Some(backend) = self.backend.as_ref() else {
            return;
        };

        match backend
            .set_with_expiry(&fingerprint.cache_key(), text, ttl)
            .await
        {
            Ok(()) => debug!(%fingerprint, ttl_secs = ttl.as_secs(), "Cached OCR result"),
            Err(e) => warn!(%fingerprint, "Failed to cache OCR result: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;

    struct FailingBackend;

    #[async_trait]
    impl CacheBackend for FailingBackend {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(GatewayError::Cache("connection refused".to_string()))
        }

        async fn set_with_expiry(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<()> {
            Err(GatewayError::Cache("connection refused".to_string()))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn ttl() -> Duration {
        Duration::from_secs(60)
    }

    #[tokio::test]
    async fn test_disabled_cache_always_misses() {
        let cache = ResultCache::disabled();
        let fp = Fingerprint::compute(b"image", "spa");

        cache.set(&fp, "HELLO", ttl()).await;

        assert!(!cache.is_enabled());
        assert_eq!(cache.backend_name(), "disabled");
        assert_eq!(cache.get(&fp).await, None);
    }

    #[tokio::test]
    async fn test_memory_cache_round_trip() {
        let cache = ResultCache::new(Arc::new(MemoryBackend::new(8)));
        let fp = Fingerprint::compute(b"image", "spa");

        assert_eq!(cache.get(&fp).await, None);
        cache.set(&fp, "HELLO", ttl()).await;
        assert_eq!(cache.get(&fp).await, Some("HELLO".to_string()));
    }

    #[tokio::test]
    async fn test_backend_errors_are_absorbed() {
        let cache = ResultCache::new(Arc::new(FailingBackend));
        let fp = Fingerprint::compute(b"image", "spa");

        cache.set(&fp, "HELLO", ttl()).await;
        assert_eq!(cache.get(&fp).await, None);
        assert_eq!(cache.backend_name(), "failing");
    }

    #[tokio::test]
    async fn test_connect_without_url_is_disabled() {
        let cache = ResultCache::connect(&CacheConfig::default()).await;
        assert!(!cache.is_enabled());
    }

    #[tokio::test]
    async fn test_connect_memory_url() {
        let config = CacheConfig {
            url: Some("memory://".to_string()),
            ..CacheConfig::default()
        };
        let cache = ResultCache::connect(&config).await;
        assert_eq!(cache.backend_name(), "memory");
    }

    #[tokio::test]
    async fn test_connect_invalid_url_degrades_to_disabled() {
        let config = CacheConfig {
            url: Some("not a url".to_string()),
            ..CacheConfig::default()
        };
        let cache = ResultCache::connect(&config).await;
        assert!(!cache.is_enabled());
    }
}
