//! Change notifications for downstream consumers of the link cache.

use super::{CALLBACK_CHANNEL, CacheBackend, CacheError};
use crate::metrics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallbackKind {
    Update,
    Evict,
}

impl CallbackKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Evict => "evict",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackMessage {
    pub key: String,
    pub value: Option<serde_json::Value>,
    #[serde(rename = "type")]
    pub kind: CallbackKind,
}

/// Raised when a change could not be announced, so consumers may now be stale.
pub trait ConsistencyAlarm: Send + Sync {
    fn alarm(&self, key: &str, value: Option<&serde_json::Value>, kind: CallbackKind);
}

/// Logs the lost notification and counts it.
#[derive(Debug, Default)]
pub struct LoggingAlarm;

impl ConsistencyAlarm for LoggingAlarm {
    fn alarm(&self, key: &str, value: Option<&serde_json::Value>, kind: CallbackKind) {
        metrics::record_consistency_alarm();
        error!(
            key = %key,
            value = ?value,
            kind = kind.as_str(),
            "Cache callback notification lost, downstream caches may be inconsistent"
        );
    }
}

pub struct CacheCallback {
    backend: Arc<dyn CacheBackend>,
    alarm: Arc<dyn ConsistencyAlarm>,
}

impl CacheCallback {
    pub fn new(backend: Arc<dyn CacheBackend>, alarm: Arc<dyn ConsistencyAlarm>) -> Self {
        Self { backend, alarm }
    }

    /// Publish a [`CallbackMessage`]. Failures go to the alarm, never to the caller.
    pub async fn notify(&self, key: &str, value: Option<serde_json::Value>, kind: CallbackKind) {
        if let Err(e) = self.try_notify(key, value.clone(), kind).await {
            debug!(key = %key, error = %e, "Callback publish failed");
            self.alarm.alarm(key, value.as_ref(), kind);
        }
    }

    async fn try_notify(
        &self,
        key: &str,
        value: Option<serde_json::Value>,
        kind: CallbackKind,
    ) -> Result<(), CacheError> {
        let message = CallbackMessage {
            key: key.to_string(),
            value,
            kind,
        };
        let payload = serde_json::to_string(&message)?;
        self.backend.publish(CALLBACK_CHANNEL, &payload).await
    }
}
