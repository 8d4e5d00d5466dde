//! Configuration for the distributor and the reservoir pool.
//!
//! Both structs are plain data populated by the host and passed to the
//! respective constructors.

/// Settings for a [`RandomDistributor`](crate::sink::distributor::RandomDistributor).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistributorConfig {
    /// Smallest generation hint passed to the pool when a sink is enqueued.
    ///
    /// The hint is `max(byte_count, request_floor)`, so producers that batch
    /// in word-sized units are always asked for at least one full batch.
    pub request_floor: usize,
}

impl Default for DistributorConfig {
    fn default() -> Self {
        Self {
            request_floor: 2 * core::mem::size_of::<usize>(),
        }
    }
}

/// Settings for a [`ReservoirPool`](crate::entropy::reservoir::ReservoirPool).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservoirConfig {
    /// Maximum number of ready bytes held at once. Input beyond this is dropped.
    pub capacity: usize,
}

impl Default for ReservoirConfig {
    fn default() -> Self {
        Self { capacity: 4096 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_floor_is_two_words() {
        let config = DistributorConfig::default();
        assert_eq!(config.request_floor, 2 * core::mem::size_of::<usize>());
    }
}
