//! Cache configuration types.

use crate::error::{CacheError, CacheResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Prefix reserved for persisted generation counters.
pub const GENERATION_KEY_PREFIX: &str = "__generation__";

/// Default stale grace window in seconds.
pub const DEFAULT_STALE_GRACE_SECONDS: u64 = 30;

/// Behavioural configuration for [`GenerationalCache`](crate::GenerationalCache).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationalCacheConfig {
    /// Serve stale entries while one caller regenerates them.
    pub use_expired_data: bool,

    /// Window during which only one caller per key is elected to regenerate.
    pub stale_grace_seconds: u64,

    /// Disambiguates composite keys across consumers sharing one store.
    pub namespace_id: String,
}

impl Default for GenerationalCacheConfig {
    fn default() -> Self {
        Self {
            use_expired_data: false,
            stale_grace_seconds: DEFAULT_STALE_GRACE_SECONDS,
            namespace_id: String::new(),
        }
    }
}

impl GenerationalCacheConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// - `ARMATURE_GENCACHE_USE_EXPIRED_DATA` - `1`/`true` enables stale serving
    /// - `ARMATURE_GENCACHE_STALE_GRACE_SECONDS` - grace window in seconds
    /// - `ARMATURE_GENCACHE_NAMESPACE` - namespace id
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    ///
    /// Unparseable values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("ARMATURE_GENCACHE_USE_EXPIRED_DATA") {
            config.use_expired_data = value == "1" || value.eq_ignore_ascii_case("true");
        }

        if let Some(value) = lookup("ARMATURE_GENCACHE_STALE_GRACE_SECONDS")
            && let Ok(seconds) = value.trim().parse()
        {
            config.stale_grace_seconds = seconds;
        }

        if let Some(namespace) = lookup("ARMATURE_GENCACHE_NAMESPACE") {
            config.namespace_id = namespace;
        }

        config
    }

    /// Enable or disable stale-while-revalidate.
    pub fn with_expired_data(mut self, enabled: bool) -> Self {
        self.use_expired_data = enabled;
        self
    }

    /// Set the stale grace window.
    pub fn with_stale_grace(mut self, grace: Duration) -> Self {
        self.stale_grace_seconds = grace.as_secs();
        self
    }

    /// Set the namespace id.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace_id = namespace.into();
        self
    }

    /// The stale grace window as a duration.
    pub fn stale_grace(&self) -> Duration {
        Duration::from_secs(self.stale_grace_seconds)
    }

    /// Whether `key` falls in the space reserved for generation counters.
    ///
    /// Any logical key whose composite key could equal a counter key starts
    /// with `__generation__:`.
    pub fn is_reserved_key(key: &str) -> bool {
        key.strip_prefix(GENERATION_KEY_PREFIX)
            .is_some_and(|rest| rest.starts_with(':'))
    }

    /// Build the store key for a logical key. The group never takes part.
    pub fn composite_key(&self, key: &str) -> String {
        if self.namespace_id.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", key, self.namespace_id)
        }
    }

    /// Build the store key holding a group's generation counter.
    pub fn generation_key(&self, group_segment: &str) -> String {
        format!(
            "{}:{}:{}",
            GENERATION_KEY_PREFIX, group_segment, self.namespace_id
        )
    }
}

/// Raw store backend type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Redis backend
    Redis,
    /// Memcached backend
    Memcached,
}

/// Connection settings for networked [`RawStore`](crate::RawStore) backends.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Backend type
    pub backend: StoreBackend,

    /// Connection URL
    pub url: String,

    /// Key prefix applied by the backend to every key
    pub key_prefix: Option<String>,

    /// Connection timeout
    pub connection_timeout: Duration,

    /// Operation timeout
    pub operation_timeout: Duration,
}

impl StoreConfig {
    /// Create a new Redis store configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use armature_gencache::StoreConfig;
    ///
    /// let config = StoreConfig::redis("redis://localhost:6379").unwrap();
    /// ```
    pub fn redis(url: impl Into<String>) -> CacheResult<Self> {
        let url = url.into();
        if !(url.starts_with("redis://") || url.starts_with("rediss://")) {
            return Err(CacheError::InvalidUrl(format!(
                "Invalid Redis URL: {}. Expected format: 'redis://host:port'",
                url
            )));
        }
        Ok(Self::with_backend(StoreBackend::Redis, url))
    }

    /// Create a new Memcached store configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use armature_gencache::StoreConfig;
    ///
    /// let config = StoreConfig::memcached("memcache://localhost:11211").unwrap();
    /// ```
    pub fn memcached(url: impl Into<String>) -> CacheResult<Self> {
        Ok(Self::with_backend(StoreBackend::Memcached, url.into()))
    }

    fn with_backend(backend: StoreBackend, url: String) -> Self {
        Self {
            backend,
            url,
            key_prefix: None,
            connection_timeout: Duration::from_secs(5),
            operation_timeout: Duration::from_secs(3),
        }
    }

    /// Set the key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Set the connection timeout.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the operation timeout.
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Build the final key with prefix if configured.
    pub fn build_key(&self, key: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }
}
