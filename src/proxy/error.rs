use std::io;

/// Errors returned by [`ProxyCache::get`](crate::ProxyCache::get).
///
/// The cache forwards producer failures unchanged. The remaining variants only occur when the
/// shard workers cannot serve requests at all.
#[derive(Debug, thiserror::Error)]
pub enum Error<E> {
    /// The producer failed. Nothing was cached for the key.
    #[error("{0}")]
    Producer(E),
    /// A shard worker thread could not be started. Allocation is retried on the next request.
    #[error("failed to start shard worker: {0}")]
    Spawn(#[source] io::Error),
    /// The worker of the given shard stopped and no longer accepts requests.
    #[error("shard {0} is no longer serving requests")]
    ShardUnavailable(usize),
}

impl<E> Error<E> {
    /// Returns the producer error if the request failed in the producer.
    pub fn into_producer_error(self) -> Option<E> {
        match self {
            Error::Producer(err) => Some(err),
            _ => None,
        }
    }
}
