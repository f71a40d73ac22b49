//! Redirect cache warm-up, run by one node per cluster.

use super::{CacheManager, INITIALIZER_KEY, REDIRECT_CACHE};
use crate::db::Database;
use crate::error::ServiceError;
use tracing::{info, warn};

/// Load every link into the redirect cache unless another node already did.
///
/// Returns the number of links cached.
pub async fn warm_redirect_cache(db: &Database, manager: &CacheManager) -> Result<usize, ServiceError> {
    let backend = manager.backend();
    if !backend.set_nx(INITIALIZER_KEY, manager.source()).await? {
        let owner = backend.get(INITIALIZER_KEY).await.ok().flatten();
        info!(owner = ?owner, "Redirect cache already initialized by another node");
        return Ok(0);
    }

    let links = db.links().list().await?;
    let cache = manager.cache(REDIRECT_CACHE);
    let mut loaded = 0;
    for link in &links {
        match cache.put(&link.code, Some(link)).await {
            Ok(()) => loaded += 1,
            Err(e) => warn!(code = %link.code, error = %e, "Failed to cache link during warm-up"),
        }
    }

    info!(loaded, total = links.len(), "Redirect cache initialized");
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryBackend;
    use crate::config::CacheConfig;
    use crate::db::{LinkRecord, memory};
    use crate::support::datetime;
    use std::sync::Arc;

    #[tokio::test]
    async fn only_first_node_warms_the_cache() {
        let db = memory().await;
        let now = datetime::now();
        for (id, code) in [(1, "B"), (2, "C")] {
            db.links()
                .insert(&LinkRecord {
                    id,
                    code: code.to_string(),
                    redirect: 302,
                    original_url: format!("https://example.com/{code}"),
                    created_at: now,
                    expires_at: now + chrono::Duration::days(1),
                    is_active: 1,
                })
                .await
                .unwrap();
        }

        let backend = MemoryBackend::new();
        let node_a = CacheManager::new(CacheConfig::default(), Arc::new(backend.clone()), "a");
        let node_b = CacheManager::new(CacheConfig::default(), Arc::new(backend.clone()), "b");

        assert_eq!(warm_redirect_cache(&db, &node_a).await.unwrap(), 2);
        assert_eq!(warm_redirect_cache(&db, &node_b).await.unwrap(), 0);

        let entry = node_b.cache(REDIRECT_CACHE).lookup("C").await.unwrap().unwrap();
        let link: LinkRecord = entry.decode().unwrap().unwrap();
        assert_eq!(link.id, 2);
    }
}
