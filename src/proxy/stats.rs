use crate::proxy::metrics::Metrics;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Aggregated request statistics, see [`ProxyCache::stats`](crate::ProxyCache::stats).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Stats {
    pub request_count: u64,
    pub hit_count: u64,
    pub miss_count: u64,
    pub expired_count: u64,
    pub error_count: u64,
    pub total_latency: Duration,
    pub millis_elapsed: u128,
}

impl Stats {
    /// Average latency per request, or [`Duration::ZERO`] without requests.
    pub fn mean_latency(&self) -> Duration {
        match u32::try_from(self.request_count) {
            Ok(0) => Duration::ZERO,
            Ok(count) => self.total_latency / count,
            Err(_) => Duration::from_nanos(
                u64::try_from(self.total_latency.as_nanos() / u128::from(self.request_count))
                    .unwrap_or(u64::MAX),
            ),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    request_count: AtomicU64,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
    expired_count: AtomicU64,
    error_count: AtomicU64,
    latency_nanos: AtomicU64,
}

impl Counters {
    pub(crate) fn record(&self, metrics: &Metrics) {
        self.request_count.fetch_add(1, Ordering::AcqRel);

        if metrics.hit {
            self.hit_count.fetch_add(1, Ordering::AcqRel);
        }

        if metrics.miss {
            self.miss_count.fetch_add(1, Ordering::AcqRel);
        }

        if metrics.expired {
            self.expired_count.fetch_add(1, Ordering::AcqRel);
        }

        if metrics.done {
            self.error_count.fetch_add(1, Ordering::AcqRel);
        }

        let nanos = u64::try_from(metrics.latency.as_nanos()).unwrap_or(u64::MAX);
        self.latency_nanos.fetch_add(nanos, Ordering::AcqRel);
    }

    /// Reads all counters into `stats` and resets them.
    pub(crate) fn drain_into(&self, stats: &mut Stats) {
        stats.request_count = self.request_count.swap(0, Ordering::AcqRel);
        stats.hit_count = self.hit_count.swap(0, Ordering::AcqRel);
        stats.miss_count = self.miss_count.swap(0, Ordering::AcqRel);
        stats.expired_count = self.expired_count.swap(0, Ordering::AcqRel);
        stats.error_count = self.error_count.swap(0, Ordering::AcqRel);
        stats.total_latency = Duration::from_nanos(self.latency_nanos.swap(0, Ordering::AcqRel));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::metrics::Outcome;

    #[test]
    fn it_counts_outcomes_and_errors() {
        // given
        let counters = Counters::default();

        let mut hit = Metrics::new(0);
        hit.record(Outcome::Hit);
        hit.latency = Duration::from_millis(1);

        let mut failed_miss = Metrics::new(1);
        failed_miss.record(Outcome::Miss);
        failed_miss.done = true;
        failed_miss.latency = Duration::from_millis(3);

        // when
        counters.record(&hit);
        counters.record(&failed_miss);

        let mut stats = Stats::default();
        counters.drain_into(&mut stats);

        // then
        assert_eq!(stats.request_count, 2);
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
        assert_eq!(stats.expired_count, 0);
        assert_eq!(stats.error_count, 1);
        assert_eq!(stats.total_latency, Duration::from_millis(4));
        assert_eq!(stats.mean_latency(), Duration::from_millis(2));
    }

    #[test]
    fn it_averages_beyond_u32_request_counts() {
        // given
        let stats = Stats {
            request_count: u64::from(u32::MAX) + 1,
            total_latency: Duration::from_secs(u64::from(u32::MAX) + 1),
            ..Default::default()
        };

        // then
        assert_eq!(stats.mean_latency(), Duration::from_secs(1));
    }

    #[test]
    fn it_resets_after_draining() {
        // given
        let counters = Counters::default();
        counters.record(&Metrics::new(0));

        // when
        let mut first = Stats::default();
        counters.drain_into(&mut first);
        let mut second = Stats::default();
        counters.drain_into(&mut second);

        // then
        assert_eq!(first.request_count, 1);
        assert_eq!(second, Stats::default());
        assert_eq!(second.mean_latency(), Duration::ZERO);
    }
}
