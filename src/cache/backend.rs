//! Second-level storage and pub/sub.

use super::CacheError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;

/// Shared key/value store with publish/subscribe, as seen by every node.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value`, expiring after `ttl` when given.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Store only if absent. Returns whether the value was written.
    async fn set_nx(&self, key: &str, value: &str) -> Result<bool, CacheError>;

    /// Delete keys, returning how many existed.
    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError>;

    /// Keys matching a glob `pattern`. `count` is a per-round-trip batch hint.
    async fn scan(&self, pattern: &str, count: usize) -> Result<Vec<String>, CacheError>;

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), CacheError>;

    /// Stream of payloads published on `channel` from now on.
    async fn subscribe(&self, channel: &str) -> Result<mpsc::Receiver<String>, CacheError>;
}
