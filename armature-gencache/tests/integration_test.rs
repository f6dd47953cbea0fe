//! Integration tests for armature-gencache

use armature_gencache::*;
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Profile {
    name: String,
}

fn ann() -> Profile {
    Profile {
        name: "Ann".to_string(),
    }
}

/// Store whose every call fails, standing in for an unreachable backend.
struct BrokenStore;

#[async_trait]
impl RawStore for BrokenStore {
    async fn get(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
        Err(CacheError::Connection("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Option<Duration>) -> CacheResult<()> {
        Err(CacheError::Connection("connection refused".to_string()))
    }

    async fn delete(&self, _key: &str) -> CacheResult<bool> {
        Err(CacheError::Connection("connection refused".to_string()))
    }

    async fn available(&self) -> bool {
        true
    }

    fn store_type(&self) -> &'static str {
        "broken"
    }
}

struct DownStore;

#[async_trait]
impl RawStore for DownStore {
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
        "down"
    }
}

/// Memory store that yields to the scheduler before every call, so
/// concurrent callers on one task interleave at each store round-trip.
#[derive(Default)]
struct YieldingStore {
    inner: InMemoryStore,
}

#[async_trait]
impl RawStore for YieldingStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        tokio::task::yield_now().await;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()> {
        tokio::task::yield_now().await;
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        tokio::task::yield_now().await;
        self.inner.delete(key).await
    }

    async fn available(&self) -> bool {
        true
    }

    fn store_type(&self) -> &'static str {
        "yielding"
    }
}

/// Memory store whose generation counter reads can be made to fail.
#[derive(Default)]
struct CounterOutageStore {
    inner: InMemoryStore,
    counter_reads_fail: AtomicBool,
}

#[async_trait]
impl RawStore for CounterOutageStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        if key.starts_with("__generation__:") && self.counter_reads_fail.load(Ordering::SeqCst) {
            return Err(CacheError::Connection("read timed out".to_string()));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()> {
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        self.inner.delete(key).await
    }

    async fn available(&self) -> bool {
        true
    }

    fn store_type(&self) -> &'static str {
        "counter-outage"
    }
}

async fn stale_serving_cache(
    store: Arc<InMemoryStore>,
    clock: Arc<ManualClock>,
) -> GenerationalCache<InMemoryStore> {
    GenerationalCache::new(
        store,
        GenerationalCacheConfig::default()
            .with_expired_data(true)
            .with_stale_grace(Duration::from_secs(30))
            .with_namespace("site-1"),
    )
    .await
    .unwrap()
    .with_clock(clock)
}

#[tokio::test]
async fn test_end_to_end_user_scenario() {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(ManualClock::new(1_700_000_000));
    let cache = stale_serving_cache(store.clone(), clock.clone()).await;

    // A second view over the same store with stale serving switched off.
    let strict = GenerationalCache::new(
        store,
        GenerationalCacheConfig::default().with_namespace("site-1"),
    )
    .await
    .unwrap();

    let users = Group::named("users");

    assert!(cache.set("user:1", &ann(), Some(Duration::ZERO), &users).await);
    assert!(cache.flush(&users).await);

    // The strict view loads the flushed counter on first use.
    assert_eq!(strict.get::<Profile>("user:1", &users).await, None);

    assert_eq!(
        cache.get_with_staleness::<Profile>("user:1", &users).await,
        (None, true)
    );
    for _ in 0..5 {
        clock.advance(Duration::from_secs(5));
        assert_eq!(
            cache.get_with_staleness::<Profile>("user:1", &users).await,
            (Some(ann()), false)
        );
    }
}

#[tokio::test]
async fn test_sequential_readers_elect_one_regenerator() {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(ManualClock::new(1_700_000_000));
    let cache = stale_serving_cache(store, clock.clone()).await;
    let users = Group::named("users");

    cache.set("user:1", &ann(), None, &users).await;
    cache.flush(&users).await;

    let reads = (0..16).map(|_| cache.get_with_staleness::<Profile>("user:1", &users));
    let results = join_all(reads).await;

    let elected = results.iter().filter(|(_, elected)| *elected).count();
    assert_eq!(elected, 1);
    for (value, is_elected) in &results {
        if !is_elected {
            assert_eq!(value.as_ref(), Some(&ann()));
        } else {
            assert!(value.is_none());
        }
    }

    clock.advance(Duration::from_secs(31));
    assert_eq!(
        cache.get_with_staleness::<Profile>("user:1", &users).await,
        (None, true)
    );
}

#[tokio::test]
async fn test_processes_sharing_a_store_converge() {
    let store = Arc::new(InMemoryStore::new());
    let config = GenerationalCacheConfig::default().with_namespace("shared");
    let web = GenerationalCache::new(store.clone(), config.clone()).await.unwrap();
    let worker = GenerationalCache::new(store, config).await.unwrap();
    let posts = Group::named("posts");

    // Both processes warm their view of the group.
    assert_eq!(web.registry().current(&posts).await, Generation::INITIAL);
    assert_eq!(worker.registry().current(&posts).await, Generation::INITIAL);

    // The worker flushes and writes a fresh entry.
    worker.flush(&posts).await;
    worker.set("post:9", &"fresh", None, &posts).await;

    // The web process has not seen the flush, but reading the newer entry
    // moves it forward.
    assert_eq!(web.get::<String>("post:9", &posts).await, Some("fresh".into()));
    assert_eq!(web.registry().cached(&posts), Some(Generation::new(2)));

    // Its next write is stamped with the adopted generation.
    web.set("post:10", &"also fresh", None, &posts).await;
    assert_eq!(worker.get::<String>("post:10", &posts).await, Some("also fresh".into()));
}

#[tokio::test]
async fn test_write_racing_a_flush_goes_stale() {
    let store = Arc::new(InMemoryStore::new());
    let config = GenerationalCacheConfig::default();
    let writer = GenerationalCache::new(store.clone(), config.clone()).await.unwrap();
    let flusher = GenerationalCache::new(store.clone(), config.clone()).await.unwrap();
    let group = Group::named("catalog");

    writer.registry().current(&group).await;
    flusher.flush(&group).await;

    // Stamped with the pre-flush generation.
    writer.set("item:1", &"old", None, &group).await;

    let reader = GenerationalCache::new(store, config).await.unwrap();
    assert_eq!(reader.get::<String>("item:1", &group).await, None);
}

#[tokio::test]
async fn test_generation_ignores_read_write_traffic() {
    let cache = GenerationalCache::new(
        Arc::new(InMemoryStore::new()),
        GenerationalCacheConfig::default(),
    )
    .await
    .unwrap();
    let group = Group::named("feeds");

    let mut observed = vec![cache.registry().current(&group).await];
    for round in 0..4u32 {
        cache.set("feed", &round, None, &group).await;
        cache.get::<u32>("feed", &group).await;
        observed.push(cache.registry().current(&group).await);

        cache.flush(&group).await;
        observed.push(cache.registry().current(&group).await);
    }

    let values: Vec<u64> = observed.iter().map(|g| g.get()).collect();
    assert_eq!(values, vec![1, 1, 2, 2, 3, 3, 4, 4, 5]);
}

#[tokio::test]
async fn test_store_failures_are_absorbed() {
    let cache = GenerationalCache::new(Arc::new(BrokenStore), GenerationalCacheConfig::default())
        .await
        .unwrap();
    let group = Group::named("users");

    assert!(!cache.set("user:1", &ann(), None, &group).await);
    assert_eq!(cache.get::<Profile>("user:1", &group).await, None);
    assert_eq!(
        cache.get_with_staleness::<Profile>("user:1", &group).await,
        (None, false)
    );
    assert!(!cache.add("user:1", &ann(), None, &group).await);
    assert!(!cache.replace("user:1", &ann(), None, &group).await);
    assert!(!cache.delete("user:1", &group).await);
    assert!(!cache.hard_delete("user:1").await);
    assert!(!cache.flush(&group).await);

    let stats = cache.stats();
    assert!(stats.write_failures >= 2);
    assert_eq!(stats.flushes, 0);
}

#[tokio::test]
async fn test_unavailable_store_is_rejected() {
    let result = GenerationalCache::new(Arc::new(DownStore), GenerationalCacheConfig::default()).await;
    assert!(matches!(result, Err(CacheError::Unavailable(_))));
}

#[tokio::test]
async fn test_selection_falls_back_to_uncached_operation() {
    let store = select_store(vec![Arc::new(DownStore) as Arc<dyn RawStore>]).await;
    let cache = GenerationalCache::new(store, GenerationalCacheConfig::default())
        .await
        .unwrap();

    let value: String = remember_forever(&cache, "answer", &Group::Default, || async {
        Ok::<_, CacheError>("computed".to_string())
    })
    .await
    .unwrap();

    assert_eq!(value, "computed");
    assert_eq!(cache.get::<String>("answer", &Group::Default).await, None);
}

#[tokio::test(start_paused = true)]
async fn test_entry_ttl_is_left_to_the_store() {
    let cache = GenerationalCache::new(
        Arc::new(InMemoryStore::new()),
        GenerationalCacheConfig::default(),
    )
    .await
    .unwrap();

    cache
        .set("session", &"token", Some(Duration::from_secs(10)), &Group::Default)
        .await;
    assert_eq!(
        cache.get::<String>("session", &Group::Default).await,
        Some("token".into())
    );

    tokio::time::advance(Duration::from_secs(11)).await;
    assert_eq!(cache.get::<String>("session", &Group::Default).await, None);
}

#[tokio::test]
async fn test_soft_delete_then_overwrite() {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(ManualClock::new(1_700_000_000));
    let cache = stale_serving_cache(store, clock).await;
    let users = Group::named("users");

    cache.set("user:1", &ann(), None, &users).await;
    assert!(cache.delete("user:1", &users).await);

    // Soft-deleted: a stale read, not a hard miss.
    let (value, elected) = cache.get_with_staleness::<Profile>("user:1", &users).await;
    assert!(value.is_none() && elected);

    let bob = Profile {
        name: "Bob".to_string(),
    };
    assert!(cache.set("user:1", &bob, None, &users).await);
    assert_eq!(cache.get::<Profile>("user:1", &users).await, Some(bob));

    assert!(cache.hard_delete("user:1").await);
    assert_eq!(
        cache.get_with_staleness::<Profile>("user:1", &users).await,
        (None, false)
    );
}

#[tokio::test]
async fn test_interleaved_readers_bound_regenerations() {
    let clock = Arc::new(ManualClock::new(1_700_000_000));
    let cache = GenerationalCache::new(
        Arc::new(YieldingStore::default()),
        GenerationalCacheConfig::default().with_expired_data(true),
    )
    .await
    .unwrap()
    .with_clock(clock.clone());
    let users = Group::named("users");

    cache.set("user:1", &ann(), None, &users).await;
    cache.flush(&users).await;

    // Readers arrive one scheduler turn apart while earlier ones are still
    // waiting on the store.
    let readers = (0..16usize).map(|arrival| {
        let cache = &cache;
        let users = &users;
        async move {
            for _ in 0..arrival {
                tokio::task::yield_now().await;
            }
            cache.get_with_staleness::<Profile>("user:1", users).await
        }
    });
    let results = join_all(readers).await;

    // Only readers whose fetch overlapped the first stale-marker write can
    // be elected; everyone arriving after it reuses the old payload.
    let elected = results.iter().filter(|(_, elected)| *elected).count();
    assert!((1..=2).contains(&elected), "elected {} readers", elected);
    assert!(results[8..].iter().all(|(value, elected)| !elected && value.as_ref() == Some(&ann())));
    for (value, is_elected) in &results {
        assert_eq!(value.is_none(), *is_elected);
    }

    assert_eq!(
        cache.get_with_staleness::<Profile>("user:1", &users).await,
        (Some(ann()), false)
    );
    clock.advance(Duration::from_secs(31));
    assert_eq!(
        cache.get_with_staleness::<Profile>("user:1", &users).await,
        (None, true)
    );
}

#[tokio::test]
async fn test_flush_during_counter_outage_keeps_flushed_data_stale() {
    let store = Arc::new(CounterOutageStore::default());
    let config = GenerationalCacheConfig::default();
    let writer = GenerationalCache::new(store.clone(), config.clone()).await.unwrap();
    let group = Group::named("catalog");

    for _ in 0..2 {
        writer.flush(&group).await;
    }
    writer.set("item:1", &"flushed-data", None, &group).await;
    for _ in 0..2 {
        writer.flush(&group).await;
    }
    assert_eq!(writer.registry().current(&group).await, Generation::new(5));

    store.counter_reads_fail.store(true, Ordering::SeqCst);
    let other = GenerationalCache::new(store.clone(), config.clone()).await.unwrap();
    assert!(!other.flush(&group).await);
    store.counter_reads_fail.store(false, Ordering::SeqCst);

    let reader = GenerationalCache::new(store, config).await.unwrap();
    assert_eq!(reader.registry().current(&group).await, Generation::new(5));
    assert_eq!(reader.get::<String>("item:1", &group).await, None);
}
