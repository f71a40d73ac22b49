//! One named two-level cache.

use super::{CacheBackend, CacheError, CacheMessage, DEFAULT_LISTENER};
use crate::config::CacheConfig;
use crate::metrics;
use moka::future::Cache;
use moka::notification::RemovalCause;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// What both levels store for a key. `value: None` is a cached "not found".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: Option<serde_json::Value>,
}

impl CacheEntry {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Option<T>, CacheError> {
        match &self.value {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(v) => Ok(Some(serde_json::from_value(v.clone())?)),
        }
    }
}

#[derive(Default)]
struct Counters {
    primary_hits: AtomicU64,
    secondary_hits: AtomicU64,
    misses: AtomicU64,
    load_successes: AtomicU64,
    load_failures: AtomicU64,
    total_load_nanos: AtomicU64,
    evictions: AtomicU64,
}

/// Point-in-time copy of a cache's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub primary_hits: u64,
    pub secondary_hits: u64,
    pub misses: u64,
    pub load_successes: u64,
    pub load_failures: u64,
    pub total_load_time: Duration,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.primary_hits + self.secondary_hits
    }
}

pub struct MultiLevelCache {
    name: String,
    primary: Cache<String, CacheEntry>,
    backend: Arc<dyn CacheBackend>,
    config: CacheConfig,
    source: String,
    load_lock: Mutex<()>,
    counters: Arc<Counters>,
}

impl MultiLevelCache {
    pub fn new(
        name: &str,
        config: &CacheConfig,
        backend: Arc<dyn CacheBackend>,
        source: &str,
    ) -> Self {
        let counters = Arc::new(Counters::default());

        let mut builder = Cache::builder()
            .name(name)
            .initial_capacity(config.init_capacity)
            .max_capacity(config.max_capacity);
        if config.expire_after_write_ms > 0 {
            builder = builder.time_to_live(Duration::from_millis(config.expire_after_write_ms));
        }
        if config.expire_after_access_ms > 0 {
            builder = builder.time_to_idle(Duration::from_millis(config.expire_after_access_ms));
        }

        let evictions = Arc::clone(&counters);
        let cache_name = name.to_string();
        let primary = builder
            .eviction_listener(move |_key, _value, cause: RemovalCause| {
                if cause.was_evicted() {
                    evictions.evictions.fetch_add(1, Ordering::Relaxed);
                    metrics::record_cache_eviction(&cache_name);
                }
            })
            .build();

        Self {
            name: name.to_string(),
            primary,
            backend,
            config: config.clone(),
            source: source.to_string(),
            load_lock: Mutex::new(()),
            counters,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn second_key(&self, key: &str) -> String {
        format!("{}:{}", self.name, key)
    }

    /// First level, then second level. Second-level hits are promoted.
    pub async fn lookup(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        if let Some(entry) = self.primary.get(key).await {
            self.counters.primary_hits.fetch_add(1, Ordering::Relaxed);
            metrics::record_cache_lookup(&self.name, "primary_hit");
            return Ok(Some(entry));
        }

        if let Some(raw) = self.backend.get(&self.second_key(key)).await? {
            let entry: CacheEntry = serde_json::from_str(&raw)?;
            self.primary.insert(key.to_string(), entry.clone()).await;
            self.counters.secondary_hits.fetch_add(1, Ordering::Relaxed);
            metrics::record_cache_lookup(&self.name, "secondary_hit");
            return Ok(Some(entry));
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        metrics::record_cache_lookup(&self.name, "miss");
        Ok(None)
    }

    /// Cached value for `key`, or the loader's result, which is then cached.
    ///
    /// A cached "not found" returns `Ok(None)` without calling the loader.
    pub async fn get_with<T, F, Fut, E>(&self, key: &str, loader: F) -> Result<Option<T>, CacheError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
        E: Display,
    {
        if let Some(entry) = self.lookup(key).await? {
            return entry.decode();
        }

        let started = Instant::now();
        let loaded = loader().await;
        let elapsed = started.elapsed();
        self.counters
            .total_load_nanos
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);

        let value = match loaded {
            Ok(value) => {
                self.counters.load_successes.fetch_add(1, Ordering::Relaxed);
                metrics::record_cache_load(&self.name, true, elapsed.as_secs_f64());
                value
            }
            Err(e) => {
                self.counters.load_failures.fetch_add(1, Ordering::Relaxed);
                metrics::record_cache_load(&self.name, false, elapsed.as_secs_f64());
                return Err(CacheError::Load(e.to_string()));
            }
        };

        let _guard = self.load_lock.lock().await;
        // Another task may have filled the key while the loader ran.
        if let Some(entry) = self.lookup(key).await? {
            return entry.decode();
        }
        self.put(key, value.as_ref()).await?;
        Ok(value)
    }

    /// Write both levels and tell the other nodes.
    pub async fn put<T: Serialize>(&self, key: &str, value: Option<&T>) -> Result<(), CacheError> {
        let value = value.map(serde_json::to_value).transpose()?;
        self.put_value(key, value).await
    }

    pub async fn put_value(
        &self,
        key: &str,
        value: Option<serde_json::Value>,
    ) -> Result<(), CacheError> {
        if value.is_none() && !self.config.allow_null {
            warn!(cache = %self.name, key = %key, "Null values are not allowed, skipping put");
            return Ok(());
        }

        let entry = CacheEntry {
            key: key.to_string(),
            value,
        };
        self.primary.insert(key.to_string(), entry.clone()).await;

        let raw = serde_json::to_string(&entry)?;
        let ttl = (self.config.redis_expires_ms > 0)
            .then(|| Duration::from_millis(self.config.redis_expires_ms));
        self.backend.set(&self.second_key(key), &raw, ttl).await?;

        self.publish(CacheMessage::update(&self.name, key, entry.value, &self.source))
            .await;
        Ok(())
    }

    /// Drop `key` from both levels and tell the other nodes.
    pub async fn evict(&self, key: &str) -> Result<(), CacheError> {
        self.backend.delete(&[self.second_key(key)]).await?;
        self.primary.invalidate(key).await;
        self.publish(CacheMessage::invalidate(&self.name, key, &self.source))
            .await;
        Ok(())
    }

    /// Drop every key of this cache from both levels.
    pub async fn clear(&self) -> Result<(), CacheError> {
        let batch = self.config.redis_scan_count.max(1);
        let keys = self
            .backend
            .scan(&format!("{}:*", self.name), batch)
            .await?;
        for chunk in keys.chunks(batch) {
            self.backend.delete(chunk).await?;
        }
        self.primary.invalidate_all();
        debug!(cache = %self.name, removed = keys.len(), "Cache cleared");
        Ok(())
    }

    pub(crate) async fn apply_remote_update(&self, key: &str, value: Option<serde_json::Value>) {
        let entry = CacheEntry {
            key: key.to_string(),
            value,
        };
        self.primary.insert(key.to_string(), entry).await;
    }

    pub(crate) async fn apply_remote_invalidate(&self, key: &str) {
        self.primary.invalidate(key).await;
    }

    /// First-level entry count after pending maintenance has run.
    pub async fn entry_count(&self) -> u64 {
        self.primary.run_pending_tasks().await;
        self.primary.entry_count()
    }

    pub fn stats(&self) -> CacheStats {
        let c = &self.counters;
        CacheStats {
            primary_hits: c.primary_hits.load(Ordering::Relaxed),
            secondary_hits: c.secondary_hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            load_successes: c.load_successes.load(Ordering::Relaxed),
            load_failures: c.load_failures.load(Ordering::Relaxed),
            total_load_time: Duration::from_nanos(c.total_load_nanos.load(Ordering::Relaxed)),
            evictions: c.evictions.load(Ordering::Relaxed),
        }
    }

    async fn publish(&self, message: CacheMessage) {
        let payload = match serde_json::to_string(&message) {
            Ok(p) => p,
            Err(e) => {
                warn!(cache = %self.name, error = %e, "Failed to encode cache message");
                return;
            }
        };
        if let Err(e) = self.backend.publish(DEFAULT_LISTENER, &payload).await {
            warn!(cache = %self.name, key = %message.key, error = %e, "Failed to publish cache message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryBackend;
    use std::sync::atomic::AtomicUsize;

    fn cache_on(backend: &MemoryBackend, source: &str, config: &CacheConfig) -> MultiLevelCache {
        MultiLevelCache::new("test-cache", config, Arc::new(backend.clone()), source)
    }

    #[tokio::test]
    async fn loader_runs_once_then_primary_hits() {
        let backend = MemoryBackend::new();
        let cache = cache_on(&backend, "node-a", &CacheConfig::default());
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        for _ in 0..3 {
            let value: Option<String> = cache
                .get_with("k", move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, CacheError>(Some("v".to_string()))
                })
                .await
                .unwrap();
            assert_eq!(value.as_deref(), Some("v"));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats();
        assert_eq!(stats.load_successes, 1);
        assert_eq!(stats.primary_hits, 2);
        assert!(backend.get("test-cache:k").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn second_node_promotes_from_second_level() {
        let backend = MemoryBackend::new();
        let config = CacheConfig::default();
        let node_a = cache_on(&backend, "node-a", &config);
        let node_b = cache_on(&backend, "node-b", &config);

        node_a.put("k", Some(&42u32)).await.unwrap();

        let entry = node_b.lookup("k").await.unwrap().unwrap();
        assert_eq!(entry.decode::<u32>().unwrap(), Some(42));
        assert_eq!(node_b.stats().secondary_hits, 1);

        node_b.lookup("k").await.unwrap();
        assert_eq!(node_b.stats().primary_hits, 1);
    }

    #[tokio::test]
    async fn not_found_is_cached_when_nulls_allowed() {
        let backend = MemoryBackend::new();
        let cache = cache_on(&backend, "node-a", &CacheConfig::default());
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        for _ in 0..2 {
            let value: Option<String> = cache
                .get_with("missing", move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, CacheError>(None)
                })
                .await
                .unwrap();
            assert!(value.is_none());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn null_put_is_skipped_when_disallowed() {
        let backend = MemoryBackend::new();
        let config = CacheConfig {
            allow_null: false,
            ..CacheConfig::default()
        };
        let cache = cache_on(&backend, "node-a", &config);

        cache.put::<String>("k", None).await.unwrap();
        assert!(cache.lookup("k").await.unwrap().is_none());
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn evict_clears_both_levels() {
        let backend = MemoryBackend::new();
        let cache = cache_on(&backend, "node-a", &CacheConfig::default());
        cache.put("k", Some(&"v")).await.unwrap();

        cache.evict("k").await.unwrap();
        assert!(cache.lookup("k").await.unwrap().is_none());
        assert!(backend.get("test-cache:k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_only_touches_own_prefix() {
        let backend = MemoryBackend::new();
        let cache = cache_on(&backend, "node-a", &CacheConfig::default());
        cache.put("a", Some(&1)).await.unwrap();
        cache.put("b", Some(&2)).await.unwrap();
        backend.set("other:a", "x", None).await.unwrap();

        cache.clear().await.unwrap();
        assert_eq!(cache.entry_count().await, 0);
        assert!(cache.lookup("a").await.unwrap().is_none());
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn loader_error_surfaces_as_load() {
        let backend = MemoryBackend::new();
        let cache = cache_on(&backend, "node-a", &CacheConfig::default());

        let err = cache
            .get_with::<String, _, _, _>("k", || async { Err("db down") })
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Load(msg) if msg == "db down"));
        assert_eq!(cache.stats().load_failures, 1);
        assert!(cache.lookup("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn second_level_ttl_applies() {
        let backend = MemoryBackend::new();
        let config = CacheConfig {
            redis_expires_ms: 20,
            ..CacheConfig::default()
        };
        let cache = cache_on(&backend, "node-a", &config);
        cache.put("k", Some(&1)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(backend.get("test-cache:k").await.unwrap().is_none());
    }
}
