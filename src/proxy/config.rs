use std::time::Duration;

/// Number of shards used when [`Config::partition_count`] is left at `0`.
pub const DEFAULT_PARTITION_COUNT: usize = 64;

/// Maximum number of cached values per shard used when [`Config::cache_size`] is left at `0`.
pub const DEFAULT_CACHE_SIZE: usize = 4096;

/// Configuration of a [`ProxyCache`](crate::ProxyCache).
///
/// Zero values are replaced by the defaults when the shards are allocated on the first request.
///
/// # Examples
///
/// ```rust
/// use proxy_cache::Config;
/// use std::time::Duration;
///
/// let config = Config::new()
///     .partition_count(16)
///     .expiration(Duration::from_secs(30));
///
/// assert_eq!(config.effective_partition_count(), 16);
/// assert_eq!(config.effective_cache_size(), proxy_cache::DEFAULT_CACHE_SIZE);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Config {
    /// Number of shards. This also roughly corresponds to the maximum number of requests that are
    /// produced concurrently.
    pub partition_count: usize,
    /// Maximum number of cached values per shard. The whole cache holds at most
    /// `partition_count * cache_size` values.
    pub cache_size: usize,
    /// Duration after which a cached value is produced again. `Duration::ZERO` means cached values
    /// never expire.
    pub expiration: Duration,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn partition_count(mut self, count: usize) -> Self {
        self.partition_count = count;
        self
    }

    pub fn cache_size(mut self, size: usize) -> Self {
        self.cache_size = size;
        self
    }

    pub fn expiration(mut self, expiration: Duration) -> Self {
        self.expiration = expiration;
        self
    }

    /// Returns the number of shards that will be allocated.
    pub fn effective_partition_count(&self) -> usize {
        match self.partition_count {
            0 => DEFAULT_PARTITION_COUNT,
            count => count,
        }
    }

    /// Returns the per-shard capacity that will be used.
    pub fn effective_cache_size(&self) -> usize {
        match self.cache_size {
            0 => DEFAULT_CACHE_SIZE,
            size => size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_substitutes_defaults_for_zero_values() {
        // when
        let config = Config::default();

        // then
        assert_eq!(config.effective_partition_count(), DEFAULT_PARTITION_COUNT);
        assert_eq!(config.effective_cache_size(), DEFAULT_CACHE_SIZE);
        assert_eq!(config.expiration, Duration::ZERO);
    }

    #[test]
    fn it_keeps_configured_values() {
        // when
        let config = Config::new()
            .partition_count(3)
            .cache_size(7)
            .expiration(Duration::from_millis(250));

        // then
        assert_eq!(config.effective_partition_count(), 3);
        assert_eq!(config.effective_cache_size(), 7);
        assert_eq!(config.expiration, Duration::from_millis(250));
    }
}
