use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::CacheBackend;
use crate::error::{GatewayError, Result};

/// Thread-safe LRU store with per-entry expiry.
///
/// Entries past their deadline are dropped on read. A TTL too large to
/// represent as a deadline never expires. When the cache is full the least
/// recently used entry is evicted.
type Entry = (String, Option<Instant>);

#[derive(Clone)]
pub struct MemoryBackend {
    entries: Arc<Mutex<LruCache<String, Entry>>>,
}

impl MemoryBackend {
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LruCache<String, Entry>>> {
        self.entries
            .lock()
            .map_err(|_| GatewayError::Cache("memory cache lock poisoned".to_string()))
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.lock()?;

        let expired = match entries.get(key) {
            Some((value, expires_at)) if expires_at.map_or(true, |at| at > Instant::now()) => {
                return Ok(Some(value.clone()))
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(key);
        }
        Ok(None)
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let expires_at = Instant::now().checked_add(ttl);
        self.lock()?
            .put(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn test_hit_after_set() {
        let cache = MemoryBackend::new(10);
        cache.set_with_expiry("k", "HELLO", HOUR).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("HELLO".to_string()));
    }

    #[tokio::test]
    async fn test_miss() {
        let cache = MemoryBackend::new(10);
        assert_eq!(cache.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_entry_is_dropped() {
        let cache = MemoryBackend::new(10);
        cache
            .set_with_expiry("k", "stale", Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(cache.get("k").await.unwrap(), None);
        assert_eq!(cache.lock().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_unrepresentable_ttl_never_expires() {
        let cache = MemoryBackend::new(10);
        cache
            .set_with_expiry("k", "v", Duration::from_secs(u64::MAX))
            .await
            .unwrap();

        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_capacity_enforcement() {
        let cache = MemoryBackend::new(2);

        cache.set_with_expiry("k1", "v1", HOUR).await.unwrap();
        cache.set_with_expiry("k2", "v2", HOUR).await.unwrap();
        cache.set_with_expiry("k3", "v3", HOUR).await.unwrap();

        assert_eq!(cache.get("k1").await.unwrap(), None);
        assert_eq!(cache.get("k2").await.unwrap(), Some("v2".to_string()));
        assert_eq!(cache.get("k3").await.unwrap(), Some("v3".to_string()));
    }

    #[tokio::test]
    async fn test_lru_ordering() {
        let cache = MemoryBackend::new(3);

        cache.set_with_expiry("k1", "v1", HOUR).await.unwrap();
        cache.set_with_expiry("k2", "v2", HOUR).await.unwrap();
        cache.set_with_expiry("k3", "v3", HOUR).await.unwrap();

        // Touch k1 so k2 becomes the eviction candidate.
        let _ = cache.get("k1").await.unwrap();
        cache.set_with_expiry("k4", "v4", HOUR).await.unwrap();

        assert_eq!(cache.get("k1").await.unwrap(), Some("v1".to_string()));
        assert_eq!(cache.get("k2").await.unwrap(), None);
        assert_eq!(cache.get("k4").await.unwrap(), Some("v4".to_string()));
    }

    #[tokio::test]
    async fn test_zero_capacity_still_stores_one_entry() {
        let cache = MemoryBackend::new(0);
        cache.set_with_expiry("k", "v", HOUR).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_concurrent_access() {
        let cache = MemoryBackend::new(100);
        let mut handles = vec![];

        for i in 0..10 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                let key = format!("key_{i}");
                let value = format!("value_{i}");
                cache.set_with_expiry(&key, &value, HOUR).await.unwrap();
                assert_eq!(cache.get(&key).await.unwrap(), Some(value));
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }
    }
}
