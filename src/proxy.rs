use crate::Stats;
use config::Config;
use error::Error;
use fnv::FnvBuildHasher;
use metrics::{Metrics, Response};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use producer::Producer;
use shard::{Reply, Shard};
use stats::Counters;
use std::borrow::Borrow;
use std::hash::{BuildHasher, Hash};
use std::io;
use std::panic;
use std::time::Instant;

pub(crate) mod config;
pub(crate) mod error;
pub(crate) mod fnv;
pub(crate) mod metrics;
pub(crate) mod producer;
mod shard;
pub(crate) mod stats;

/// Cache that sits in front of an expensive producer and remembers what it produced.
///
/// Keys are partitioned over a fixed number of shards by a deterministic 32-bit FNV hash. Each
/// shard owns an [`Lru`](crate::Lru) store and a worker thread that serves the requests routed to
/// it one after another. On a miss or an expired value the worker calls the producer, caches the
/// result, and replies. Requests for the same shard therefore never produce concurrently, while
/// requests for different shards proceed in parallel.
///
/// The shards are allocated by the first call to [`ProxyCache::get`]. Wrap the cache in a
/// [`std::sync::Arc`] to share it between threads.
#[derive(Debug)]
pub struct ProxyCache<K, V, S = FnvBuildHasher> {
    config: Config,
    hash_builder: S,
    shards: OnceCell<Vec<Shard<K, V>>>,
    counters: Counters,
    metrics_last_accessed: Mutex<Instant>,
}

impl<K, V> ProxyCache<K, V, FnvBuildHasher> {
    /// Creates a cache with the default configuration.
    pub fn new() -> ProxyCache<K, V, FnvBuildHasher> {
        ProxyCache::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> ProxyCache<K, V, FnvBuildHasher> {
        ProxyCache::with_config_and_hasher(config, Default::default())
    }
}

impl<K, V> Default for ProxyCache<K, V, FnvBuildHasher> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> ProxyCache<K, V, S> {
    /// Creates a cache using `hash_builder` to route keys to shards.
    ///
    /// The hasher must produce the same hash for the same key during the lifetime of the cache.
    pub fn with_config_and_hasher(config: Config, hash_builder: S) -> ProxyCache<K, V, S> {
        Self {
            config,
            hash_builder,
            shards: OnceCell::new(),
            counters: Counters::default(),
            metrics_last_accessed: Mutex::new(Instant::now()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the number of shards the keys are partitioned over.
    pub fn partition_count(&self) -> usize {
        self.config.effective_partition_count()
    }

    /// Returns the statistics collected since the previous call and resets them.
    pub fn stats(&self) -> Stats {
        let mut stats = Stats::default();

        let millis_elapsed = {
            let mut guard = self.metrics_last_accessed.lock();
            let millis_elapsed = guard.elapsed().as_millis();
            *guard = Instant::now();
            millis_elapsed
        };

        stats.millis_elapsed = millis_elapsed;
        self.counters.drain_into(&mut stats);

        stats
    }
}

impl<K, V, S> ProxyCache<K, V, S>
where
    K: Clone + Eq + Hash + Send + 'static,
    V: Clone + Send + 'static,
    S: BuildHasher,
{
    /// Returns the cached value for `key`, or calls `producer` to produce and cache it if there is
    /// no value or the value has expired.
    ///
    /// The call blocks while the key's shard serves earlier requests and while the producer runs.
    /// The measured latency of the first call includes allocating the shards.
    /// Producer errors are returned as [`Error::Producer`] and leave nothing cached for the key.
    /// If the producer panics, the panic is resumed on the calling thread and the shard keeps
    /// serving.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use proxy_cache::{Outcome, ProxyCache};
    ///
    /// let cache: ProxyCache<String, String> = ProxyCache::new();
    /// let producer = |key: &String| Ok::<_, std::io::Error>(key.to_uppercase());
    ///
    /// let first = cache.get(String::from("hello"), producer);
    /// assert_eq!(first.metrics.outcome(), Some(Outcome::Miss));
    ///
    /// let second = cache.get(String::from("hello"), producer);
    /// assert_eq!(second.metrics.outcome(), Some(Outcome::Hit));
    /// assert_eq!(second.into_result().unwrap(), "HELLO");
    /// ```
    pub fn get<P>(&self, key: K, producer: P) -> Response<V, P::Error>
    where
        P: Producer<K, V> + Send + 'static,
        P::Error: Send + 'static,
    {
        let started = Instant::now();
        let shards = self.shards();

        let index = self.shard_index(&key);
        let mut metrics = Metrics::new(index);

        let reply = match shards {
            Ok(shards) => shards.get(index).and_then(|shard| shard.submit(key, producer)),
            Err(err) => {
                return self.finish(metrics, started, Err(Error::Spawn(err)));
            }
        };

        let result = match reply {
            Some(Reply::Served { outcome, result }) => {
                metrics.record(outcome);
                result.map_err(Error::Producer)
            }
            Some(Reply::Panicked { outcome, payload }) => {
                metrics.record(outcome);
                metrics.done = true;
                metrics.latency = started.elapsed();
                self.counters.record(&metrics);
                panic::resume_unwind(payload);
            }
            None => {
                tracing::error!(shard = index, "shard worker is gone");
                Err(Error::ShardUnavailable(index))
            }
        };

        self.finish(metrics, started, result)
    }

    /// Returns the shard `key` is routed to.
    pub fn shard_index<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
    {
        let hash = self.hash_builder.hash_one(key);
        (hash % self.partition_count() as u64) as usize
    }

    fn finish<E>(
        &self,
        mut metrics: Metrics,
        started: Instant,
        result: Result<V, Error<E>>,
    ) -> Response<V, E> {
        // set when the request failed
        metrics.done = result.is_err();
        metrics.latency = started.elapsed();
        self.counters.record(&metrics);

        Response { metrics, result }
    }

    fn shards(&self) -> io::Result<&[Shard<K, V>]> {
        self.shards
            .get_or_try_init(|| {
                let count = self.config.effective_partition_count();
                let capacity = self.config.effective_cache_size();
                let expiration = self.config.expiration;

                tracing::debug!(count, capacity, ?expiration, "allocating shards");

                (0..count)
                    .map(|index| Shard::spawn(index, capacity, expiration))
                    .collect::<io::Result<Vec<_>>>()
            })
            .map(Vec::as_slice)
    }
}
