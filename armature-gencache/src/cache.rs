//! Generation-tagged cache over a [`RawStore`].
//!
//! Every entry is stamped with its group's generation when written. A
//! flush only bumps the group counter; entries from older generations are
//! found stale on their next read and either dropped or, with
//! `use_expired_data`, served while a single elected caller regenerates.
//!
//! Store failures never escape: reads degrade to misses and writes report
//! `false`.

use crate::clock::{Clock, SystemClock};
use crate::codec::{Entry, EntryCodec};
use crate::config::GenerationalCacheConfig;
use crate::error::{CacheError, CacheResult};
use crate::generation::{Generation, Group};
use crate::registry::GenerationRegistry;
use crate::stats::{CacheStats, CacheStatsSnapshot};
use crate::traits::RawStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Cache with O(1) group flush and stale-while-revalidate reads.
pub struct GenerationalCache<S: RawStore + ?Sized> {
    store: Arc<S>,
    registry: GenerationRegistry<S>,
    config: GenerationalCacheConfig,
    clock: Arc<dyn Clock>,
    stats: CacheStats,
}

impl<S: RawStore + ?Sized> GenerationalCache<S> {
    /// Create a cache over `store`.
    ///
    /// Fails with [`CacheError::Unavailable`] if the store's capability
    /// probe says it cannot be used.
    ///
    /// # Examples
    ///
    /// ```
    /// use armature_gencache::*;
    /// use std::sync::Arc;
    ///
    /// # async fn example() -> Result<(), CacheError> {
    /// let store = Arc::new(InMemoryStore::new());
    /// let cache = GenerationalCache::new(store, GenerationalCacheConfig::default()).await?;
    ///
    /// cache.set("user:1", &"Ann", None, &"users".into()).await;
    /// cache.flush(&"users".into()).await;
    /// assert_eq!(cache.get::<String>("user:1", &"users".into()).await, None);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(store: Arc<S>, config: GenerationalCacheConfig) -> CacheResult<Self> {
        if !store.available().await {
            return Err(CacheError::Unavailable(store.store_type().to_string()));
        }

        info!(
            backend = store.store_type(),
            namespace = %config.namespace_id,
            use_expired_data = config.use_expired_data,
            stale_grace_seconds = config.stale_grace_seconds,
            "Generational cache ready"
        );

        Ok(Self {
            registry: GenerationRegistry::new(store.clone(), config.clone()),
            store,
            config,
            clock: Arc::new(SystemClock),
            stats: CacheStats::default(),
        })
    }

    /// Replace the time source used for stale markers.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &GenerationalCacheConfig {
        &self.config
    }

    /// Generation registry backing this cache.
    pub fn registry(&self) -> &GenerationRegistry<S> {
        &self.registry
    }

    /// Underlying raw store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Current statistics.
    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    /// Read an entry, resolving it against its group's generation.
    ///
    /// Returns `(entry, elected)`:
    ///
    /// - `(Some(entry), false)` - fresh hit, or a stale entry served while
    ///   another caller regenerates it
    /// - `(None, true)` - the entry is stale and this caller is elected to
    ///   regenerate it; no other caller is elected until the grace window
    ///   passes
    /// - `(None, false)` - miss
    pub async fn get_entry_with_staleness(&self, key: &str, group: &Group) -> (Option<Entry>, bool) {
        let Some(store_key) = self.store_key(key) else {
            self.stats.record_miss();
            return (None, false);
        };

        let Some(entry) = self.fetch(&store_key).await else {
            self.stats.record_miss();
            return (None, false);
        };

        let current = self.registry.current(group).await;
        match entry.generation.cmp(&current) {
            Ordering::Equal => {
                trace!(key = %key, group = %group, "Cache hit");
                self.stats.record_hit();
                (Some(entry), false)
            }
            Ordering::Greater => {
                // Written after a flush this process has not seen yet.
                self.registry.observe(group, entry.generation);
                self.stats.record_hit();
                (Some(entry), false)
            }
            Ordering::Less => self.resolve_stale(key, &store_key, entry, group).await,
        }
    }

    async fn resolve_stale(
        &self,
        key: &str,
        store_key: &str,
        mut entry: Entry,
        group: &Group,
    ) -> (Option<Entry>, bool) {
        if !self.config.use_expired_data {
            trace!(key = %key, group = %group, generation = %entry.generation, "Stale entry treated as miss");
            self.stats.record_miss();
            return (None, false);
        }

        let now = self.clock.now();
        if entry.in_grace_window(now) {
            trace!(key = %key, group = %group, "Serving stale entry during regeneration");
            self.stats.record_stale_hit();
            return (Some(entry), false);
        }

        let grace = i64::try_from(self.config.stale_grace_seconds).unwrap_or(i64::MAX);
        entry.stale_until = Some(now.saturating_add(grace));
        if !self.persist(store_key, &entry, None).await {
            debug!(key = %key, "Could not persist stale marker");
        }

        debug!(key = %key, group = %group, generation = %entry.generation, "Elected to regenerate stale entry");
        self.stats.record_regeneration();
        (None, true)
    }

    /// Typed [`get_entry_with_staleness`](Self::get_entry_with_staleness).
    ///
    /// A payload that does not deserialize into `T` counts as absent.
    pub async fn get_with_staleness<T: DeserializeOwned>(&self, key: &str, group: &Group) -> (Option<T>, bool) {
        let (entry, elected) = self.get_entry_with_staleness(key, group).await;
        let value = entry.and_then(|entry| match entry.into_payload() {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(key = %key, error = %e, "Cached payload has an unexpected shape");
                None
            }
        });
        (value, elected)
    }

    /// Get a typed value. Both a miss and an election read as `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str, group: &Group) -> Option<T> {
        self.get_with_staleness(key, group).await.0
    }

    /// Store a value stamped with the group's current generation.
    ///
    /// `ttl` of `None` or zero keeps the entry until evicted. Returns
    /// `false` if the value was not cached, including for keys starting
    /// with `__generation__:`.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
        group: &Group,
    ) -> bool {
        let Some(store_key) = self.store_key(key) else {
            self.stats.record_write(false);
            return false;
        };

        let generation = self.registry.current(group).await;
        let entry = match Entry::from_value(value, generation) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to encode cache value");
                self.stats.record_write(false);
                return false;
            }
        };

        let ttl = ttl.filter(|ttl| !ttl.is_zero());
        let stored = self.persist(&store_key, &entry, ttl).await;
        self.stats.record_write(stored);
        stored
    }

    /// Store a value only if no usable value is cached.
    pub async fn add<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
        group: &Group,
    ) -> bool {
        if self.get_entry_with_staleness(key, group).await.0.is_some() {
            return false;
        }
        self.set(key, value, ttl, group).await
    }

    /// Store a value only if a usable value is already cached.
    pub async fn replace<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
        group: &Group,
    ) -> bool {
        if self.get_entry_with_staleness(key, group).await.0.is_none() {
            return false;
        }
        self.set(key, value, ttl, group).await
    }

    /// Delete an entry.
    ///
    /// With `use_expired_data` the entry is kept as a permanently stale
    /// fallback: its generation becomes [`Generation::TOMBSTONE`], its
    /// stale marker is cleared and it is rewritten without expiry. Otherwise,
    /// or if nothing decodable is stored, the key is removed.
    pub async fn delete(&self, key: &str, group: &Group) -> bool {
        let Some(store_key) = self.store_key(key) else {
            return false;
        };

        if self.config.use_expired_data
            && let Some(mut entry) = self.fetch(&store_key).await
        {
            debug!(key = %key, group = %group, "Soft-deleting entry");
            entry.generation = Generation::TOMBSTONE;
            entry.stale_until = None;
            return self.persist(&store_key, &entry, None).await;
        }

        self.remove(&store_key).await
    }

    /// Remove an entry from the store regardless of configuration.
    pub async fn hard_delete(&self, key: &str) -> bool {
        match self.store_key(key) {
            Some(store_key) => self.remove(&store_key).await,
            None => false,
        }
    }

    /// Invalidate every entry in `group` by advancing its generation.
    ///
    /// Returns `false` if the new generation could not be persisted; this
    /// process still uses it.
    pub async fn flush(&self, group: &Group) -> bool {
        match self.registry.advance(group).await {
            Ok(generation) => {
                debug!(group = %group, generation = %generation, "Flushed group");
                self.stats.record_flush();
                true
            }
            Err(e) => {
                warn!(group = %group, error = %e, "Failed to persist flushed generation");
                false
            }
        }
    }

    /// Composite key for `key`, or `None` for keys in the counter space.
    fn store_key(&self, key: &str) -> Option<String> {
        if GenerationalCacheConfig::is_reserved_key(key) {
            warn!(key = %key, "Rejecting key reserved for generation counters");
            return None;
        }
        Some(self.config.composite_key(key))
    }

    fn log_store_error(&self, operation: &'static str, store_key: &str, error: &CacheError) {
        if error.is_transport_error() {
            warn!(key = %store_key, backend = self.store.store_type(), error = %error, "Cache {} failed", operation);
        } else {
            debug!(key = %store_key, backend = self.store.store_type(), error = %error, "Cache {} rejected", operation);
        }
    }

    async fn fetch(&self, store_key: &str) -> Option<Entry> {
        match self.store.get(store_key).await {
            Ok(Some(bytes)) => match EntryCodec::decode(&bytes) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!(key = %store_key, error = %e, "Ignoring undecodable entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                self.log_store_error("read", store_key, &e);
                None
            }
        }
    }

    async fn persist(&self, store_key: &str, entry: &Entry, ttl: Option<Duration>) -> bool {
        let bytes = match EntryCodec::encode(entry) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = %store_key, error = %e, "Failed to encode entry");
                return false;
            }
        };

        match self.store.set(store_key, bytes, ttl).await {
            Ok(()) => true,
            Err(e) => {
                self.log_store_error("write", store_key, &e);
                false
            }
        }
    }

    async fn remove(&self, store_key: &str) -> bool {
        match self.store.delete(store_key).await {
            Ok(_) => true,
            Err(e) => {
                self.log_store_error("delete", store_key, &e);
                false
            }
        }
    }
}
