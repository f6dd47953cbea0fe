//! Redis raw store.

use crate::config::{StoreBackend, StoreConfig};
use crate::error::{CacheError, CacheResult};
use crate::traits::RawStore;
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::time::Duration;
use tracing::{debug, warn};

/// Redis raw store.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    config: StoreConfig,
}

impl RedisStore {
    /// Connect to Redis.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use armature_gencache::*;
    /// use std::sync::Arc;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), CacheError> {
    ///     let config = StoreConfig::redis("redis://localhost:6379")?.with_key_prefix("app");
    ///     let store = Arc::new(RedisStore::new(config).await?);
    ///     let cache = GenerationalCache::new(store, GenerationalCacheConfig::default()).await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: StoreConfig) -> CacheResult<Self> {
        if config.backend != StoreBackend::Redis {
            return Err(CacheError::Config(format!(
                "RedisStore requires a Redis configuration, got {:?}",
                config.backend
            )));
        }

        let client =
            Client::open(config.url.as_str()).map_err(|e| CacheError::Connection(e.to_string()))?;

        let connection = tokio::time::timeout(config.connection_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CacheError::Connection("Timed out connecting to Redis".to_string()))?
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        debug!(url = %config.url, "Connected to Redis");
        Ok(Self { connection, config })
    }

    /// Get the underlying connection manager.
    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    /// Build the full key with prefix.
    fn build_key(&self, key: &str) -> String {
        self.config.build_key(key)
    }

    /// Redis rejects `SETEX 0`, so sub-second TTLs round up to one second.
    fn ttl_seconds(ttl: Duration) -> u64 {
        ttl.as_secs().max(1)
    }

    async fn bounded<T, F>(&self, operation: F) -> CacheResult<T>
    where
        F: std::future::Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.config.operation_timeout, operation).await {
            Ok(result) => result.map_err(CacheError::from),
            Err(_) => Err(CacheError::Connection("Redis operation timed out".to_string())),
        }
    }
}

#[async_trait]
impl RawStore for RedisStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let key = self.build_key(key);
        let mut conn = self.connection.clone();
        self.bounded(async move {
            let value: Option<Vec<u8>> = conn.get(&key).await?;
            Ok::<_, redis::RedisError>(value)
        })
        .await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()> {
        let key = self.build_key(key);
        let mut conn = self.connection.clone();

        match ttl {
            Some(ttl) => {
                let seconds = Self::ttl_seconds(ttl);
                self.bounded(async move {
                    let _: () = conn.set_ex(&key, value, seconds).await?;
                    Ok::<_, redis::RedisError>(())
                })
                .await
            }
            None => {
                self.bounded(async move {
                    let _: () = conn.set(&key, value).await?;
                    Ok::<_, redis::RedisError>(())
                })
                .await
            }
        }
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let key = self.build_key(key);
        let mut conn = self.connection.clone();
        let removed: i64 = self
            .bounded(async move {
                let removed: i64 = conn.del(&key).await?;
                Ok::<_, redis::RedisError>(removed)
            })
            .await?;
        Ok(removed > 0)
    }

    async fn available(&self) -> bool {
        let mut conn = self.connection.clone();
        let ping = self
            .bounded(async move {
                let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
                Ok::<_, redis::RedisError>(pong)
            })
            .await;

        match ping {
            Ok(_) => true,
            Err(e) => {
                warn!(url = %self.config.url, error = %e, "Redis ping failed");
                false
            }
        }
    }

    fn store_type(&self) -> &'static str {
        "redis"
    }
}
