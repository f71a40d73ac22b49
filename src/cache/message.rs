//! Cluster messages that keep first levels coherent across nodes.

use super::{CacheBackend, CacheManager, DEFAULT_LISTENER};
use crate::metrics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Update,
    Invalidate,
}

/// One first-level change, published by the node that made it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMessage {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub key: String,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    pub source: String,
}

impl CacheMessage {
    pub fn update(name: &str, key: &str, value: Option<serde_json::Value>, source: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: MessageType::Update,
            key: key.to_string(),
            value,
            source: source.to_string(),
        }
    }

    pub fn invalidate(name: &str, key: &str, source: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: MessageType::Invalidate,
            key: key.to_string(),
            value: None,
            source: source.to_string(),
        }
    }
}

/// Subscribe to [`DEFAULT_LISTENER`] and apply other nodes' changes to the
/// local first levels until `shutdown` fires.
pub async fn spawn_receiver(
    backend: Arc<dyn CacheBackend>,
    manager: Arc<CacheManager>,
    shutdown: CancellationToken,
) -> Result<JoinHandle<()>, super::CacheError> {
    let mut rx = backend.subscribe(DEFAULT_LISTENER).await?;
    info!(channel = DEFAULT_LISTENER, source = %manager.source(), "Cache message receiver started");

    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                payload = rx.recv() => match payload {
                    Some(payload) => handle_payload(&manager, &payload).await,
                    None => {
                        warn!(channel = DEFAULT_LISTENER, "Cache message subscription closed");
                        break;
                    }
                },
            }
        }
        debug!("Cache message receiver stopped");
    }))
}

pub(crate) async fn handle_payload(manager: &CacheManager, payload: &str) {
    let message: CacheMessage = match serde_json::from_str(payload) {
        Ok(m) => m,
        Err(e) => {
            debug!(error = %e, "Ignoring undecodable cache message");
            metrics::record_cache_message("invalid");
            return;
        }
    };

    if message.source == manager.source() {
        metrics::record_cache_message("ignored");
        return;
    }

    let cache = manager.cache(&message.name);
    match message.kind {
        MessageType::Update => cache.apply_remote_update(&message.key, message.value).await,
        MessageType::Invalidate => cache.apply_remote_invalidate(&message.key).await,
    }
    metrics::record_cache_message("applied");
    debug!(cache = %message.name, key = %message.key, kind = ?message.kind, from = %message.source, "Applied cache message");
}
