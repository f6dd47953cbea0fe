//! Per-group generation counters.
//!
//! Counters live in the raw store under a key derived from the group and
//! are cached in process memory. Different processes may briefly disagree
//! about a group's generation; a reader that meets a newer entry adopts its
//! generation through [`GenerationRegistry::observe`].

use crate::config::GenerationalCacheConfig;
use crate::error::CacheResult;
use crate::generation::{Generation, Group};
use crate::traits::RawStore;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Maps groups to their current generation.
pub struct GenerationRegistry<S: RawStore + ?Sized> {
    store: Arc<S>,
    config: GenerationalCacheConfig,
    cached: DashMap<Group, Generation>,
}

impl<S: RawStore + ?Sized> GenerationRegistry<S> {
    /// Create a registry over `store`. Counter keys are scoped by the
    /// config's namespace.
    pub fn new(store: Arc<S>, config: GenerationalCacheConfig) -> Self {
        Self {
            store,
            config,
            cached: DashMap::new(),
        }
    }

    fn counter_key(&self, group: &Group) -> String {
        self.config.generation_key(group.key_segment())
    }

    /// Current generation of `group`.
    ///
    /// Served from process memory once known. Otherwise the persisted
    /// counter is read and cached; a missing or malformed counter reads as
    /// [`Generation::INITIAL`]. A failed store read is not cached, so the
    /// next call retries.
    pub async fn current(&self, group: &Group) -> Generation {
        match self.load(group).await {
            Ok(generation) => generation,
            Err(e) => {
                warn!(group = %group, error = %e, "Failed to read generation counter");
                Generation::INITIAL
            }
        }
    }

    /// Cached generation of `group`, or the persisted counter read into the
    /// cache. Store errors are returned and nothing is cached.
    async fn load(&self, group: &Group) -> CacheResult<Generation> {
        if let Some(generation) = self.cached.get(group) {
            return Ok(*generation);
        }

        let key = self.counter_key(group);
        let persisted = match self.store.get(&key).await? {
            Some(raw) => Generation::from_persisted(&raw),
            None => Generation::INITIAL,
        };

        trace!(group = %group, generation = %persisted, "Loaded generation counter");

        // A concurrent observe() may have landed while the read was in flight.
        let mut slot = self.cached.entry(group.clone()).or_insert(persisted);
        if *slot < persisted {
            *slot = persisted;
        }
        Ok(*slot)
    }

    /// Bump `group` to its next generation and persist it without expiry.
    ///
    /// Fails without advancing if the counter cannot be read, since the
    /// next value would be computed from a guess. Once read, the new
    /// generation is adopted locally even if persisting fails; the error is
    /// returned so callers can report the flush as unconfirmed.
    pub async fn advance(&self, group: &Group) -> CacheResult<Generation> {
        self.load(group).await?;

        let next = {
            let mut slot = self
                .cached
                .entry(group.clone())
                .or_insert(Generation::INITIAL);
            *slot = slot.next();
            *slot
        };

        debug!(group = %group, generation = %next, "Advancing generation");

        let key = self.counter_key(group);
        self.store.set(&key, next.to_persisted(), None).await?;
        Ok(next)
    }

    /// Adopt `generation` for `group` if it is newer than the cached value.
    ///
    /// Nothing is persisted: the generation came from an entry, so the
    /// stored counter is already at least that high. Groups not yet loaded
    /// are left alone so the next [`current`](Self::current) reads the
    /// counter itself.
    pub fn observe(&self, group: &Group, generation: Generation) {
        if let Some(mut slot) = self.cached.get_mut(group)
            && generation > *slot
        {
            let previous = *slot;
            *slot = generation;
            debug!(
                group = %group,
                from = %previous,
                to = %generation,
                "Adopting newer generation"
            );
        }
    }

    /// Cached generation for `group`, without touching the store.
    pub fn cached(&self, group: &Group) -> Option<Generation> {
        self.cached.get(group).map(|g| *g)
    }
}
