//! Multi-level cache.
//!
//! Each named cache keeps a moka first level in process and a shared second
//! level behind [`CacheBackend`] (Redis, or an in-process stand-in). Nodes
//! keep their first levels coherent by publishing [`CacheMessage`]s on a
//! shared channel.

pub mod backend;
pub mod callback;
pub mod initializer;
pub mod manager;
pub mod memory;
pub mod message;
pub mod multi_level;
pub mod redis_backend;

pub use backend::CacheBackend;
pub use callback::{CacheCallback, CallbackKind, CallbackMessage, ConsistencyAlarm, LoggingAlarm};
pub use manager::CacheManager;
pub use memory::MemoryBackend;
pub use message::{CacheMessage, MessageType};
pub use multi_level::{CacheEntry, CacheStats, MultiLevelCache};
pub use redis_backend::RedisBackend;

use thiserror::Error;

/// Channel every node listens on for first-level updates.
pub const DEFAULT_LISTENER: &str = "venus-default-listener";
/// Cache holding link lookups by short code.
pub const REDIRECT_CACHE: &str = "venus-redirect";
/// Channel for change notifications to downstream consumers.
pub const CALLBACK_CHANNEL: &str = "venus-cache-callback";
/// SETNX guard so only one node warms the redirect cache.
pub const INITIALIZER_KEY: &str = "venus-initializer-kv";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("cache load failed: {0}")]
    Load(String),
}
