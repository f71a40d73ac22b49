//! Registry of named caches sharing one backend.

use super::{CacheBackend, MultiLevelCache};
use crate::config::CacheConfig;
use crate::metrics;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct CacheManager {
    caches: DashMap<String, Arc<MultiLevelCache>>,
    config: CacheConfig,
    backend: Arc<dyn CacheBackend>,
    source: String,
}

impl CacheManager {
    pub fn new(config: CacheConfig, backend: Arc<dyn CacheBackend>, source: impl Into<String>) -> Self {
        Self {
            caches: DashMap::new(),
            config,
            backend,
            source: source.into(),
        }
    }

    /// The cache called `name`, created on first use.
    pub fn cache(&self, name: &str) -> Arc<MultiLevelCache> {
        if let Some(cache) = self.caches.get(name) {
            return Arc::clone(cache.value());
        }
        let entry = self.caches.entry(name.to_string()).or_insert_with(|| {
            debug!(cache = %name, "Creating cache");
            Arc::new(MultiLevelCache::new(
                name,
                &self.config,
                Arc::clone(&self.backend),
                &self.source,
            ))
        });
        Arc::clone(entry.value())
    }

    pub fn cache_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// This node's identity on the message channel.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn backend(&self) -> Arc<dyn CacheBackend> {
        Arc::clone(&self.backend)
    }

    /// Refresh `venus_cache_entries{cache}` for every cache.
    pub async fn publish_entry_counts(&self) {
        let caches: Vec<Arc<MultiLevelCache>> =
            self.caches.iter().map(|e| Arc::clone(e.value())).collect();
        for cache in caches {
            metrics::set_cache_entries(cache.name(), cache.entry_count().await);
        }
    }
}

/// Periodically publish first-level sizes until `shutdown` fires.
pub fn spawn_metrics_task(
    manager: Arc<CacheManager>,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => manager.publish_entry_counts().await,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::message::handle_payload;
    use crate::cache::{CacheMessage, MemoryBackend, REDIRECT_CACHE};

    fn manager(backend: &MemoryBackend, source: &str) -> CacheManager {
        CacheManager::new(CacheConfig::default(), Arc::new(backend.clone()), source)
    }

    #[tokio::test]
    async fn cache_is_created_once() {
        let backend = MemoryBackend::new();
        let manager = manager(&backend, "node-a");
        let first = manager.cache(REDIRECT_CACHE);
        let second = manager.cache(REDIRECT_CACHE);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(manager.cache_names(), vec![REDIRECT_CACHE.to_string()]);
    }

    #[tokio::test]
    async fn remote_messages_touch_first_level_only() {
        let backend = MemoryBackend::new();
        let node_b = manager(&backend, "node-b");

        let update = CacheMessage::update(REDIRECT_CACHE, "B", Some(serde_json::json!(7)), "node-a");
        handle_payload(&node_b, &serde_json::to_string(&update).unwrap()).await;

        let cache = node_b.cache(REDIRECT_CACHE);
        assert_eq!(cache.entry_count().await, 1);
        assert!(backend.is_empty());

        let invalidate = CacheMessage::invalidate(REDIRECT_CACHE, "B", "node-a");
        handle_payload(&node_b, &serde_json::to_string(&invalidate).unwrap()).await;
        assert_eq!(cache.entry_count().await, 0);
    }

    #[tokio::test]
    async fn own_and_garbage_messages_are_ignored() {
        let backend = MemoryBackend::new();
        let node = manager(&backend, "node-a");

        let own = CacheMessage::update(REDIRECT_CACHE, "B", Some(serde_json::json!(7)), "node-a");
        handle_payload(&node, &serde_json::to_string(&own).unwrap()).await;
        handle_payload(&node, "not json").await;

        assert_eq!(node.cache(REDIRECT_CACHE).entry_count().await, 0);
    }
}
