//! Raw store backends
//!
//! - **Memory**: process-local map with per-key TTL (default, single-instance)
//! - **Null**: stores nothing; the fallback when no backend is available
//! - **Redis**: shared store for multi-instance deployments (`redis` feature)
//! - **Memcached**: shared store for multi-instance deployments (`memcached` feature)

mod memory;
mod null;

#[cfg(feature = "redis")]
mod redis;

#[cfg(feature = "memcached")]
mod memcached;

pub use memory::InMemoryStore;
pub use null::NullStore;

#[cfg(feature = "redis")]
pub use redis::RedisStore;

#[cfg(feature = "memcached")]
pub use memcached::MemcachedStore;

use crate::traits::RawStore;
use std::sync::Arc;
use tracing::{debug, info};

/// Pick the first candidate whose capability probe succeeds.
///
/// Falls back to a [`NullStore`], so callers always get a usable backend
/// and simply run uncached when nothing else is reachable.
pub async fn select_store(candidates: Vec<Arc<dyn RawStore>>) -> Arc<dyn RawStore> {
    for candidate in candidates {
        if candidate.available().await {
            info!(backend = candidate.store_type(), "Selected cache backend");
            return candidate;
        }
        debug!(backend = candidate.store_type(), "Cache backend unavailable, skipping");
    }

    info!("No cache backend available, caching disabled");
    Arc::new(NullStore::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheResult;
    use async_trait::async_trait;
    use std::time::Duration;

    struct OfflineStore;

    #[async_trait]
    impl RawStore for OfflineStore {
        async fn get(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Option<Duration>) -> CacheResult<()> {
            Ok(())
        }

        async fn delete(&self, _key: &str) -> CacheResult<bool> {
            Ok(false)
        }

        async fn available(&self) -> bool {
            false
        }

        fn store_type(&self) -> &'static str {
            "offline"
        }
    }

    #[tokio::test]
    async fn test_select_skips_unavailable() {
        let candidates: Vec<Arc<dyn RawStore>> = vec![
            Arc::new(OfflineStore) as Arc<dyn RawStore>,
            Arc::new(InMemoryStore::new()),
        ];
        let selected = select_store(candidates).await;
        assert_eq!(selected.store_type(), "memory");
    }

    #[tokio::test]
    async fn test_select_falls_back_to_null() {
        let selected = select_store(vec![Arc::new(OfflineStore) as Arc<dyn RawStore>]).await;
        assert_eq!(selected.store_type(), "null");

        let selected = select_store(Vec::new()).await;
        assert_eq!(selected.store_type(), "null");
    }
}
