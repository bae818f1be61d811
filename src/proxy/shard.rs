use crate::lru::Lru;
use crate::proxy::metrics::Outcome;
use crate::proxy::producer::Producer;
use crossbeam::channel::{self, Sender};
use std::any::Any;
use std::hash::Hash;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::{Duration, Instant};

/// Work item executed on the worker thread with exclusive access to the shard's store.
pub(crate) type Job<K, V> = Box<dyn FnOnce(&mut Store<K, V>) + Send>;

pub(crate) enum Reply<V, E> {
    Served {
        outcome: Outcome,
        result: Result<V, E>,
    },
    Panicked {
        outcome: Outcome,
        payload: Box<dyn Any + Send>,
    },
}

#[derive(Debug)]
struct Cached<V> {
    value: V,
    expiry: Option<Instant>,
}

impl<V> Cached<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expiry.is_some_and(|expiry| now > expiry)
    }
}

/// State owned by a shard's worker thread. Nothing else ever touches it.
pub(crate) struct Store<K, V> {
    index: usize,
    expiration: Duration,
    lru: Lru<K, Cached<V>>,
}

impl<K, V> Store<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    pub(crate) fn new(index: usize, capacity: usize, expiration: Duration) -> Self {
        Self {
            index,
            expiration,
            lru: Lru::with_capacity(capacity),
        }
    }

    /// Returns the cached value for `key` if it is fresh, and otherwise produces, caches and
    /// returns a new one. A failed or panicking producer leaves no entry behind.
    pub(crate) fn serve<P>(&mut self, key: K, producer: &P) -> Reply<V, P::Error>
    where
        P: Producer<K, V>,
    {
        let shard = self.index;
        let expiration = self.expiration;

        let outcome = match self.lru.get(&key) {
            None => Outcome::Miss,
            Some(cached) if expiration.is_zero() || !cached.is_expired(Instant::now()) => {
                tracing::trace!(shard, "cache hit");
                return Reply::Served {
                    outcome: Outcome::Hit,
                    result: Ok(cached.value.clone()),
                };
            }
            Some(_) => Outcome::Expired,
        };

        if outcome == Outcome::Expired {
            self.lru.remove(&key);
        }

        tracing::trace!(shard, ?outcome, "producing value");

        match panic::catch_unwind(AssertUnwindSafe(|| producer.produce(&key))) {
            Ok(Ok(value)) => {
                let expiry = if expiration.is_zero() {
                    None
                } else {
                    // overflowing the clock means the value never expires
                    Instant::now().checked_add(expiration)
                };

                self.lru.insert(
                    key,
                    Cached {
                        value: value.clone(),
                        expiry,
                    },
                );

                Reply::Served {
                    outcome,
                    result: Ok(value),
                }
            }
            Ok(Err(err)) => {
                tracing::debug!(shard, ?outcome, "producer failed");
                Reply::Served {
                    outcome,
                    result: Err(err),
                }
            }
            Err(payload) => {
                tracing::warn!(shard, ?outcome, "producer panicked");
                Reply::Panicked { outcome, payload }
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lru.len()
    }
}

/// Handle to a worker thread that serves the requests of one partition in arrival order.
///
/// The queue is a rendezvous channel, so a request is only handed over once the worker is done
/// with the previous one. The worker stops when the handle is dropped.
#[derive(Debug)]
pub(crate) struct Shard<K, V> {
    queue: Sender<Job<K, V>>,
}

impl<K, V> Shard<K, V>
where
    K: Clone + Eq + Hash + Send + 'static,
    V: Clone + Send + 'static,
{
    pub(crate) fn spawn(index: usize, capacity: usize, expiration: Duration) -> io::Result<Self> {
        let (queue, jobs) = channel::bounded::<Job<K, V>>(0);
        let mut store = Store::new(index, capacity, expiration);

        thread::Builder::new()
            .name(format!("proxy-cache-shard-{index}"))
            .spawn(move || {
                tracing::debug!(shard = index, capacity, "shard worker started");

                for job in jobs {
                    job(&mut store);
                }

                tracing::debug!(shard = index, "shard worker stopped");
            })?;

        Ok(Self { queue })
    }

    /// Hands the request to the worker and waits for its reply.
    ///
    /// Returns [`None`] if the worker is gone.
    pub(crate) fn submit<P>(&self, key: K, producer: P) -> Option<Reply<V, P::Error>>
    where
        P: Producer<K, V> + Send + 'static,
        P::Error: Send + 'static,
    {
        let (reply_sender, reply) = channel::bounded(1);

        let job: Job<K, V> = Box::new(move |store: &mut Store<K, V>| {
            // the receiver only disappears if the caller unwound, nobody is left to notify then
            let _ = reply_sender.send(store.serve(key, &producer));
        });

        self.queue.send(job).ok()?;
        reply.recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn unwrap_served<V, E>(reply: Reply<V, E>) -> (Outcome, Result<V, E>) {
        match reply {
            Reply::Served { outcome, result } => (outcome, result),
            Reply::Panicked { .. } => panic!("producer was not expected to panic"),
        }
    }

    #[test]
    fn it_produces_on_miss_and_serves_hits_from_the_store() {
        // given
        let mut store = Store::new(0, 10, Duration::ZERO);
        let calls = Cell::new(0);
        let producer = |key: &String| -> Result<String, String> {
            calls.set(calls.get() + 1);
            Ok(format!("value-{key}"))
        };

        // when
        let (first_outcome, first) = unwrap_served(store.serve(String::from("key"), &producer));
        let (second_outcome, second) = unwrap_served(store.serve(String::from("key"), &producer));

        // then
        assert_eq!(first_outcome, Outcome::Miss);
        assert_eq!(first.as_deref(), Ok("value-key"));
        assert_eq!(second_outcome, Outcome::Hit);
        assert_eq!(second.as_deref(), Ok("value-key"));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn it_reproduces_expired_values() {
        // given
        let mut store = Store::new(0, 10, Duration::from_millis(20));
        let calls = Cell::new(0);
        let producer = |_: &u32| -> Result<u32, String> {
            calls.set(calls.get() + 1);
            Ok(calls.get())
        };
        store.serve(1, &producer);

        // when
        thread::sleep(Duration::from_millis(50));
        let (outcome, result) = unwrap_served(store.serve(1, &producer));

        // then
        assert_eq!(outcome, Outcome::Expired);
        assert_eq!(result, Ok(2));
        assert_eq!(calls.get(), 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn it_never_expires_with_zero_expiration() {
        // given
        let mut store = Store::new(0, 10, Duration::ZERO);
        let producer = |key: &u32| -> Result<u32, String> { Ok(*key) };
        store.serve(1, &producer);

        // when
        thread::sleep(Duration::from_millis(20));
        let (outcome, _) = unwrap_served(store.serve(1, &producer));

        // then
        assert_eq!(outcome, Outcome::Hit);
    }

    #[test]
    fn it_leaves_no_entry_when_production_fails() {
        // given
        let mut store: Store<u32, u32> = Store::new(0, 10, Duration::ZERO);
        let failing = |_: &u32| -> Result<u32, String> { Err(String::from("unavailable")) };

        // when
        let (outcome, result) = unwrap_served(store.serve(1, &failing));

        // then
        assert_eq!(outcome, Outcome::Miss);
        assert_eq!(result, Err(String::from("unavailable")));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn it_drops_expired_entries_when_refresh_fails() {
        // given
        let mut store: Store<u32, u32> = Store::new(0, 10, Duration::from_millis(10));
        store.serve(1, &|key: &u32| -> Result<u32, String> { Ok(*key) });
        thread::sleep(Duration::from_millis(30));

        // when
        let failing = |_: &u32| -> Result<u32, String> { Err(String::from("unavailable")) };
        let (outcome, result) = unwrap_served(store.serve(1, &failing));

        // then
        assert_eq!(outcome, Outcome::Expired);
        assert!(result.is_err());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn it_reports_panicking_producers() {
        // given
        let mut store: Store<u32, u32> = Store::new(0, 10, Duration::ZERO);
        let panicking = |_: &u32| -> Result<u32, String> { panic!("producer exploded") };

        // when
        let reply = store.serve(1, &panicking);

        // then
        match reply {
            Reply::Panicked { outcome, payload } => {
                assert_eq!(outcome, Outcome::Miss);
                assert_eq!(payload.downcast_ref::<&str>(), Some(&"producer exploded"));
            }
            Reply::Served { .. } => panic!("expected the panic to be reported"),
        }
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn it_evicts_beyond_shard_capacity() {
        // given
        let mut store = Store::new(0, 2, Duration::ZERO);
        let producer = |key: &u32| -> Result<u32, String> { Ok(*key) };

        // when
        for key in 0..3 {
            store.serve(key, &producer);
        }
        let (outcome, _) = unwrap_served(store.serve(0, &producer));

        // then
        assert_eq!(outcome, Outcome::Miss);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn it_serves_requests_on_the_worker_thread() {
        // given
        let shard: Shard<u32, String> = Shard::spawn(3, 10, Duration::ZERO).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        // when
        let counter = Arc::clone(&calls);
        let first = shard.submit(7, move |key: &u32| -> Result<String, String> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(thread::current().name().unwrap_or_default().to_owned() + &key.to_string())
        });
        let second = shard.submit(7, |_: &u32| -> Result<String, String> {
            Err(String::from("must not be called"))
        });

        // then
        let (outcome, result) = unwrap_served(first.unwrap());
        assert_eq!(outcome, Outcome::Miss);
        assert_eq!(result.as_deref(), Ok("proxy-cache-shard-37"));

        let (outcome, result) = unwrap_served(second.unwrap());
        assert_eq!(outcome, Outcome::Hit);
        assert_eq!(result.as_deref(), Ok("proxy-cache-shard-37"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
