/// Produces the value for a key whenever the cache holds no fresh value for it.
///
/// A producer is moved into the shard that owns the key and runs on that shard's worker thread.
/// Different shards may run producers concurrently, but a shard never runs two at the same time.
///
/// Any `Fn(&K) -> Result<V, E>` closure is a producer. Capture shared state through an
/// [`std::sync::Arc`] to use the same backend for many requests:
///
/// ```rust
/// use proxy_cache::ProxyCache;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// let cache: ProxyCache<String, usize> = ProxyCache::new();
/// let calls = Arc::new(AtomicUsize::new(0));
///
/// let counter = Arc::clone(&calls);
/// let response = cache.get(String::from("hello"), move |key: &String| {
///     counter.fetch_add(1, Ordering::SeqCst);
///     Ok::<_, std::io::Error>(key.len())
/// });
///
/// assert_eq!(response.into_result().unwrap(), 5);
/// assert_eq!(calls.load(Ordering::SeqCst), 1);
/// ```
pub trait Producer<K, V> {
    type Error;

    fn produce(&self, key: &K) -> Result<V, Self::Error>;
}

impl<K, V, E, F> Producer<K, V> for F
where
    F: Fn(&K) -> Result<V, E>,
{
    type Error = E;

    fn produce(&self, key: &K) -> Result<V, E> {
        self(key)
    }
}
