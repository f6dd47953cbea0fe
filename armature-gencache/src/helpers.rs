//! Read-through helpers built on the stale-aware read path.

use crate::cache::GenerationalCache;
use crate::error::CacheResult;
use crate::generation::Group;
use crate::traits::RawStore;
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::debug;

/// Remember a value for a given duration.
///
/// Returns the cached value when one is usable, including a stale value
/// served while another caller regenerates it. On a miss, or when this
/// caller is elected to regenerate, runs `factory`, caches the result and
/// returns it. A failed cache write does not fail the call.
pub async fn remember<S, T, F, Fut>(
    cache: &GenerationalCache<S>,
    key: &str,
    group: &Group,
    ttl: Option<Duration>,
    factory: F,
) -> CacheResult<T>
where
    S: RawStore + ?Sized,
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = CacheResult<T>>,
{
    let (cached, elected) = cache.get_with_staleness::<T>(key, group).await;
    if let Some(value) = cached {
        return Ok(value);
    }

    if elected {
        debug!(key = %key, group = %group, "Regenerating stale entry");
    }

    let value = factory().await?;
    cache.set(key, &value, ttl, group).await;
    Ok(value)
}

/// Remember a value forever (no TTL).
pub async fn remember_forever<S, T, F, Fut>(
    cache: &GenerationalCache<S>,
    key: &str,
    group: &Group,
    factory: F,
) -> CacheResult<T>
where
    S: RawStore + ?Sized,
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = CacheResult<T>>,
{
    remember(cache, key, group, None, factory).await
}
