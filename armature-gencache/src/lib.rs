//! Generation-tagged cache layer for Armature.
//!
//! Sits on top of a plain key/value store and adds two things the store
//! cannot do on its own:
//!
//! - **O(1) group flush** - every entry carries the generation of its
//!   group; flushing a group bumps one counter and every older entry turns
//!   stale on its next read. No keys are enumerated or deleted.
//! - **Stale-while-revalidate** - with `use_expired_data`, the first reader
//!   of a stale entry is elected to regenerate it while everyone else keeps
//!   getting the old payload for a bounded grace window.
//!
//! The cache never fails the operation it accelerates: store errors and
//! corrupt entries come back as misses or `false`.
//!
//! # Features
//!
//! - `redis` - Enable the Redis store (enabled by default)
//! - `memcached` - Enable the Memcached store (requires explicit opt-in)
//!
//! # Examples
//!
//! ## Group flush
//!
//! ```
//! use armature_gencache::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), CacheError> {
//! let cache = GenerationalCache::new(
//!     Arc::new(InMemoryStore::new()),
//!     GenerationalCacheConfig::default(),
//! )
//! .await?;
//! let users = Group::named("users");
//!
//! cache.set("user:1", &"Ann", None, &users).await;
//! cache.flush(&users).await;
//!
//! assert_eq!(cache.get::<String>("user:1", &users).await, None);
//! # Ok(())
//! # }
//! ```
//!
//! ## Stale-while-revalidate
//!
//! ```
//! use armature_gencache::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), CacheError> {
//! let config = GenerationalCacheConfig::default().with_expired_data(true);
//! let cache = GenerationalCache::new(Arc::new(InMemoryStore::new()), config).await?;
//! let users = Group::named("users");
//!
//! cache.set("user:1", &"Ann", None, &users).await;
//! cache.flush(&users).await;
//!
//! // First reader regenerates, the rest reuse the old value meanwhile.
//! let (value, elected) = cache.get_with_staleness::<String>("user:1", &users).await;
//! assert_eq!((value, elected), (None, true));
//!
//! let (value, elected) = cache.get_with_staleness::<String>("user:1", &users).await;
//! assert_eq!((value.as_deref(), elected), (Some("Ann"), false));
//! # Ok(())
//! # }
//! ```
//!
//! ## Backend selection
//!
//! ```no_run
//! use armature_gencache::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), CacheError> {
//! let redis = RedisStore::new(StoreConfig::redis("redis://localhost:6379")?).await?;
//! let store = select_store(vec![Arc::new(redis) as Arc<dyn RawStore>]).await;
//! let cache = GenerationalCache::new(store, GenerationalCacheConfig::from_env()).await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod clock;
pub mod codec;
pub mod config;
pub mod error;
pub mod generation;
pub mod helpers;
pub mod registry;
pub mod stats;
pub mod stores;
pub mod traits;

pub use cache::GenerationalCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{Entry, EntryCodec};
pub use config::{GenerationalCacheConfig, StoreBackend, StoreConfig};
pub use error::{CacheError, CacheResult};
pub use generation::{Generation, Group};
pub use helpers::*;
pub use registry::GenerationRegistry;
pub use stats::{CacheStats, CacheStatsSnapshot};
pub use stores::{InMemoryStore, NullStore, select_store};
pub use traits::RawStore;

#[cfg(feature = "redis")]
pub use stores::RedisStore;

#[cfg(feature = "memcached")]
pub use stores::MemcachedStore;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cache::GenerationalCache;
    pub use crate::config::GenerationalCacheConfig;
    pub use crate::error::{CacheError, CacheResult};
    pub use crate::generation::{Generation, Group};
    pub use crate::helpers::{remember, remember_forever};
    pub use crate::stores::{InMemoryStore, NullStore, select_store};
    pub use crate::traits::RawStore;

    #[cfg(feature = "redis")]
    pub use crate::stores::RedisStore;

    #[cfg(feature = "memcached")]
    pub use crate::stores::MemcachedStore;
}
