//! In-process second level for single-node deployments and tests.
//!
//! Clones share storage and channels, so two caches built on clones of one
//! `MemoryBackend` behave like two nodes attached to the same Redis.

use super::{CacheBackend, CacheError};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

const CHANNEL_CAPACITY: usize = 1024;

struct StoredValue {
    value: String,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn new(value: &str, ttl: Option<Duration>) -> Self {
        Self {
            value: value.to_string(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Default)]
struct Shared {
    entries: DashMap<String, StoredValue>,
    channels: DashMap<String, broadcast::Sender<String>>,
}

#[derive(Clone, Default)]
pub struct MemoryBackend {
    shared: Arc<Shared>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live (unexpired) key count.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.shared
            .entries
            .iter()
            .filter(|e| !e.is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        let expired = match self.shared.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.shared
                .entries
                .remove_if(key, |_, v| v.is_expired(Instant::now()));
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        self.shared
            .entries
            .insert(key.to_string(), StoredValue::new(value, ttl));
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str) -> Result<bool, CacheError> {
        match self.shared.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired(Instant::now()) {
                    occupied.insert(StoredValue::new(value, None));
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(StoredValue::new(value, None));
                Ok(true)
            }
        }
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError> {
        let now = Instant::now();
        let removed = keys
            .iter()
            .filter_map(|k| self.shared.entries.remove(k))
            .filter(|(_, v)| !v.is_expired(now))
            .count();
        Ok(removed as u64)
    }

    async fn scan(&self, pattern: &str, _count: usize) -> Result<Vec<String>, CacheError> {
        let pattern = glob::Pattern::new(pattern)
            .map_err(|e| CacheError::Backend(format!("invalid scan pattern: {e}")))?;
        let now = Instant::now();
        Ok(self
            .shared
            .entries
            .iter()
            .filter(|e| !e.is_expired(now) && pattern.matches(e.key()))
            .map(|e| e.key().clone())
            .collect())
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), CacheError> {
        if let Some(tx) = self.shared.channels.get(channel) {
            // No live subscriber is not an error, same as Redis PUBLISH returning 0.
            let _ = tx.send(payload.to_string());
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<mpsc::Receiver<String>, CacheError> {
        let mut source = self
            .shared
            .channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe();
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let channel = channel.to_string();

        tokio::spawn(async move {
            loop {
                match source.recv().await {
                    Ok(payload) => {
                        if tx.send(payload).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(channel = %channel, skipped, "Subscriber lagged, messages dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!(channel = %channel, "Subscription closed");
        });

        Ok(rx)
    }
}
