//! Memcached raw store.

use crate::config::{StoreBackend, StoreConfig};
use crate::error::{CacheError, CacheResult};
use crate::traits::RawStore;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Longest relative expiration Memcached accepts; larger values are read
/// as absolute unix timestamps.
const MAX_RELATIVE_EXPIRATION: u64 = 60 * 60 * 24 * 30;

/// Memcached raw store.
///
/// The `memcache` crate is blocking, so the client sits behind tokio's
/// Mutex and every call runs on `spawn_blocking`.
#[derive(Clone)]
pub struct MemcachedStore {
    client: Arc<Mutex<memcache::Client>>,
    config: StoreConfig,
}

impl MemcachedStore {
    /// Connect to Memcached.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use armature_gencache::*;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), CacheError> {
    ///     let config = StoreConfig::memcached("memcache://localhost:11211")?;
    ///     let store = MemcachedStore::new(config).await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: StoreConfig) -> CacheResult<Self> {
        if config.backend != StoreBackend::Memcached {
            return Err(CacheError::Config(format!(
                "MemcachedStore requires a Memcached configuration, got {:?}",
                config.backend
            )));
        }

        let server_url = Self::parse_memcached_url(&config.url)?;
        let timeout = config.operation_timeout;

        let client = tokio::task::spawn_blocking(move || {
            let client = memcache::connect(server_url.as_str())?;
            client.set_read_timeout(Some(timeout))?;
            client.set_write_timeout(Some(timeout))?;
            Ok::<_, memcache::MemcacheError>(client)
        })
        .await
        .map_err(|e| CacheError::Connection(format!("Failed to spawn task: {}", e)))?
        .map_err(|e| CacheError::Connection(format!("Failed to connect: {}", e)))?;

        debug!(url = %config.url, "Connected to Memcached");
        Ok(Self {
            client: Arc::new(Mutex::new(client)),
            config,
        })
    }

    /// Parse Memcached URL to extract server address.
    ///
    /// Accepts "memcache://localhost:11211" or plain "localhost:11211".
    fn parse_memcached_url(url: &str) -> CacheResult<String> {
        if url.starts_with("memcache://") {
            Ok(url.to_string())
        } else if url.contains(':') {
            Ok(format!("memcache://{}", url))
        } else {
            Err(CacheError::InvalidUrl(format!(
                "Invalid Memcached URL: {}. Expected format: 'memcache://host:port' or 'host:port'",
                url
            )))
        }
    }

    /// Build the full key with prefix.
    fn build_key(&self, key: &str) -> String {
        self.config.build_key(key)
    }

    /// Convert a TTL to a Memcached expiration in seconds. `0` never expires.
    fn duration_to_expiration(ttl: Option<Duration>) -> CacheResult<u32> {
        match ttl {
            None => Ok(0),
            Some(ttl) => {
                let seconds = ttl.as_secs().max(1);
                if seconds > MAX_RELATIVE_EXPIRATION {
                    return Err(CacheError::Config(format!(
                        "Memcached TTL of {}s exceeds the 30 day relative limit",
                        seconds
                    )));
                }
                Ok(seconds as u32)
            }
        }
    }

    async fn run<T, F>(&self, operation: F) -> CacheResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&memcache::Client) -> Result<T, memcache::MemcacheError> + Send + 'static,
    {
        let client = self.client.clone();
        tokio::task::spawn_blocking(move || {
            let client = client.blocking_lock();
            operation(&client)
        })
        .await
        .map_err(|e| CacheError::Other(format!("Task join error: {}", e)))?
        .map_err(CacheError::from)
    }
}

#[async_trait]
impl RawStore for MemcachedStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let key = self.build_key(key);
        self.run(move |client| client.get::<Vec<u8>>(&key)).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()> {
        let key = self.build_key(key);
        let expiration = Self::duration_to_expiration(ttl)?;
        self.run(move |client| client.set(&key, value.as_slice(), expiration))
            .await
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let key = self.build_key(key);
        self.run(move |client| client.delete(&key)).await
    }

    async fn available(&self) -> bool {
        match self.run(|client| client.version()).await {
            Ok(_) => true,
            Err(e) => {
                warn!(url = %self.config.url, error = %e, "Memcached version probe failed");
                false
            }
        }
    }

    fn store_type(&self) -> &'static str {
        "memcached"
    }
}
