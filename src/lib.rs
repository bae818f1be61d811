//! An in-process cache that sits in front of an expensive producer.
//!
//! [`ProxyCache::get`] answers "give me the value for this key, producing it if it is absent or
//! stale" while bounding memory with least-recently-used eviction and avoiding redundant
//! concurrent production of values.
//!
//! # Features
//!
//! - Keys are partitioned over independent shards by a deterministic FNV hash
//! - Each shard is served by a single worker thread, so no two requests of a shard ever produce
//!   at the same time and the shard's store needs no locking
//! - Optional time-based expiration of cached values
//! - Per-request metrics and aggregated statistics
//! - A standalone O(1) [`Lru`] store
//! - No unsafe code
//!
//! The cache never retries and has no timeouts. A slow producer stalls every key of its shard,
//! so callers that need bounded latency have to enforce it inside their producer.
//!
//! # Examples
//!
//! Producing values on demand:
//!
//! ```rust
//! use proxy_cache::{Config, ProxyCache};
//! use std::time::Duration;
//!
//! let cache: ProxyCache<String, String> =
//!     ProxyCache::with_config(Config::new().expiration(Duration::from_secs(60)));
//!
//! let producer = |key: &String| Ok::<_, std::io::Error>(format!("value for {key}"));
//!
//! // the first request calls the producer
//! let response = cache.get(String::from("hello"), producer);
//! assert!(response.metrics.miss);
//! assert_eq!(response.into_result().unwrap(), "value for hello");
//!
//! // the second one is served from the cache
//! let response = cache.get(String::from("hello"), producer);
//! assert!(response.metrics.hit);
//! ```
//!
//! Producer errors are handed back unchanged and nothing is cached:
//!
//! ```rust
//! use proxy_cache::{Error, ProxyCache};
//!
//! let cache: ProxyCache<u32, String> = ProxyCache::new();
//!
//! let response = cache.get(7, |_: &u32| Err::<String, _>("backend unavailable"));
//! assert!(response.metrics.done);
//! assert!(matches!(response.result, Err(Error::Producer("backend unavailable"))));
//!
//! let response = cache.get(7, |key: &u32| Ok::<_, &str>(key.to_string()));
//! assert!(response.metrics.miss);
//! ```
//!
//! Sharing the cache between threads:
//!
//! ```rust
//! use proxy_cache::ProxyCache;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let cache: Arc<ProxyCache<u64, u64>> = Arc::new(ProxyCache::new());
//!
//! let handles: Vec<_> = (0..4)
//!     .map(|i| {
//!         let cache = Arc::clone(&cache);
//!         thread::spawn(move || {
//!             cache
//!                 .get(i, |key: &u64| Ok::<_, std::io::Error>(key * key))
//!                 .into_result()
//!                 .unwrap()
//!         })
//!     })
//!     .collect();
//!
//! let squares: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
//! assert_eq!(squares, vec![0, 1, 4, 9]);
//! ```

#![forbid(unsafe_code)]
pub mod lru;
pub mod proxy;

pub use lru::Lru;
pub use proxy::ProxyCache;
pub use proxy::config::{Config, DEFAULT_CACHE_SIZE, DEFAULT_PARTITION_COUNT};
pub use proxy::error::Error;
pub use proxy::fnv::{Fnv32Hasher, FnvBuildHasher};
pub use proxy::metrics::{Metrics, Outcome, Response};
pub use proxy::producer::Producer;
pub use proxy::stats::Stats;
