//! Raw store trait definition.

use crate::error::CacheResult;
use async_trait::async_trait;
use std::time::Duration;

/// Byte-oriented key/value store the generational cache is layered on.
///
/// Implementations are pure transports: they hold no invariants of their
/// own and report transport failures as errors. Corrupt or unreadable
/// values should come back as `Ok(None)`.
#[async_trait]
pub trait RawStore: Send + Sync {
    /// Get a value from the store.
    ///
    /// Returns `Ok(Some(bytes))` if the key exists, `Ok(None)` on a miss.
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Store a value.
    ///
    /// # Arguments
    ///
    /// * `key` - The store key
    /// * `value` - The encoded value
    /// * `ttl` - Time-to-live; `None` keeps the value until evicted
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()>;

    /// Delete a key. Returns `true` if a value was removed.
    async fn delete(&self, key: &str) -> CacheResult<bool>;

    /// Cheap capability probe, called once when a backend is selected.
    async fn available(&self) -> bool;

    /// Backend name for logging.
    fn store_type(&self) -> &'static str;
}
