//! Null raw store
//!
//! Accepts every write and stores nothing. Used when no real backend is
//! available so the application keeps running uncached.

use crate::error::CacheResult;
use crate::traits::RawStore;
use async_trait::async_trait;
use std::time::Duration;

/// Raw store that never holds data.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl NullStore {
    /// Create a new null store
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RawStore for NullStore {
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
        true
    }

    fn store_type(&self) -> &'static str {
        "null"
    }
}
