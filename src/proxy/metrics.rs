use crate::proxy::error::Error;
use std::time::Duration;

/// Path a request took through its shard.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Outcome {
    /// A fresh cached value was returned. The producer was not called.
    Hit,
    /// No value was cached. The producer was called.
    Miss,
    /// The cached value had expired and was dropped. The producer was called.
    Expired,
}

/// Events recorded during a single [`ProxyCache::get`](crate::ProxyCache::get) call.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Metrics {
    /// Set for every request.
    pub request: bool,
    /// Set when a fresh cached value was returned.
    pub hit: bool,
    /// Set when the cached value existed but had expired.
    pub expired: bool,
    /// Set when no cached value existed.
    pub miss: bool,
    /// Set when the request ended in an error.
    pub done: bool,
    /// Shard the key was routed to. Useful to observe the distribution of keys over shards.
    pub shard: usize,
    /// Time spent in the cache request, including waiting for the shard and producing.
    pub latency: Duration,
}

impl Metrics {
    pub(crate) fn new(shard: usize) -> Self {
        Self {
            request: true,
            shard,
            ..Default::default()
        }
    }

    pub(crate) fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Hit => self.hit = true,
            Outcome::Miss => self.miss = true,
            Outcome::Expired => self.expired = true,
        }
    }

    /// Returns the recorded outcome, or [`None`] if the request never reached its shard.
    pub fn outcome(&self) -> Option<Outcome> {
        if self.hit {
            Some(Outcome::Hit)
        } else if self.miss {
            Some(Outcome::Miss)
        } else if self.expired {
            Some(Outcome::Expired)
        } else {
            None
        }
    }
}

/// Result of a [`ProxyCache::get`](crate::ProxyCache::get) call.
///
/// The metrics are available whether or not the request succeeded.
#[derive(Debug)]
pub struct Response<V, E> {
    pub metrics: Metrics,
    pub result: Result<V, Error<E>>,
}

impl<V, E> Response<V, E> {
    pub fn into_result(self) -> Result<V, Error<E>> {
        self.result
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn is_err(&self) -> bool {
        self.result.is_err()
    }
}
