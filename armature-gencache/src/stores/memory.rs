//! In-memory raw store
//!
//! Backed by a `parking_lot` map, so no operation awaits. Suitable for
//! single-process deployments and tests; expiry uses tokio's clock and
//! follows paused test time.

use crate::error::CacheResult;
use crate::traits::RawStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

#[derive(Clone)]
struct StoredValue {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }
}

/// In-memory raw store
#[derive(Default)]
pub struct InMemoryStore {
    data: RwLock<HashMap<String, StoredValue>>,
}

impl InMemoryStore {
    /// Create new in-memory store
    pub fn new() -> Self {
        debug!("Creating new in-memory cache store");
        Self::default()
    }

    /// Number of stored keys, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Remaining time-to-live of a key. `None` if the key is missing,
    /// expired or stored without expiry.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let data = self.data.read();
        let stored = data.get(key)?;
        stored
            .expires_at
            .filter(|exp| *exp > now)
            .map(|exp| exp - now)
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut data = self.data.write();
        let before = data.len();
        data.retain(|_, stored| !stored.is_expired(now));
        let removed = before - data.len();
        if removed > 0 {
            debug!(removed = removed, "Purged expired entries");
        }
        removed
    }
}

#[async_trait]
impl RawStore for InMemoryStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let data = self.data.read();
        match data.get(key) {
            Some(stored) if !stored.is_expired(Instant::now()) => {
                trace!(key = %key, "Memory store hit");
                Ok(Some(stored.value.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()> {
        let expires_at = ttl.map(|d| Instant::now() + d);
        self.data
            .write()
            .insert(key.to_string(), StoredValue { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let removed = self.data.write().remove(key);
        Ok(removed.is_some_and(|stored| !stored.is_expired(Instant::now())))
    }

    async fn available(&self) -> bool {
        true
    }

    fn store_type(&self) -> &'static str {
        "memory"
    }
}
