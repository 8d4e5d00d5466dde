//! In-memory reservoir pool.
//!
//! Collected entropy is appended to a bounded FIFO reserve and handed out
//! front-first, so every byte leaves the pool at most once.
//!
//! # Security
//! - **No duplication**: extracted bytes are removed from the reserve, and the
//!   degraded path consumes whatever remains as key material.
//! - **Zeroization**: the reserve and the derivation chain live in `Zeroizing`
//!   storage; extracted bytes are wiped from the reserve before it is compacted.
//! - **Non-sleeping**: guarded by a spin lock so it can be fed from contexts
//!   that must not block.

extern crate alloc;
use alloc::vec::Vec;
use spin::Mutex;
use zeroize::{Zeroize, Zeroizing};

use super::{EntropyError, EntropyPool};
use crate::config::ReservoirConfig;

const DEGRADED_CONTEXT: &str = "rndsink reservoir 2024-01-01 degraded extract";

struct Reserve {
    ready: Zeroizing<Vec<u8>>,
    /// Ratchet key for degraded output; replaced on every degraded extract.
    chain: Zeroizing<[u8; 32]>,
    degraded_counter: u64,
    /// Largest unmet generation hint, 0 when satisfied.
    pending: usize,
    hints: u64,
}

impl Reserve {
    fn take_front(&mut self, dest: &mut [u8]) {
        let n = dest.len();
        dest.copy_from_slice(&self.ready[..n]);
        self.ready[..n].zeroize();
        self.ready.drain(..n);
    }
}

/// A bounded reserve of ready entropy bytes.
pub struct ReservoirPool {
    config: ReservoirConfig,
    reserve: Mutex<Reserve>,
}

impl ReservoirPool {
    /// Creates an empty pool.
    pub fn new(config: ReservoirConfig) -> Self {
        Self {
            config,
            reserve: Mutex::new(Reserve {
                ready: Zeroizing::new(Vec::with_capacity(config.capacity)),
                chain: Zeroizing::new([0u8; 32]),
                degraded_counter: 0,
                pending: 0,
                hints: 0,
            }),
        }
    }

    /// Appends freshly gathered entropy.
    ///
    /// Returns the number of bytes accepted; anything past the configured
    /// capacity is dropped. Callers should run the distributor afterwards.
    pub fn add_entropy(&self, bytes: &[u8]) -> usize {
        let mut reserve = self.reserve.lock();
        let room = self.config.capacity.saturating_sub(reserve.ready.len());
        let accepted = bytes.len().min(room);
        reserve.ready.extend_from_slice(&bytes[..accepted]);

        if accepted < bytes.len() {
            log::debug!(
                "reservoir full: dropped {} of {} bytes",
                bytes.len() - accepted,
                bytes.len()
            );
        }
        if reserve.pending != 0 && reserve.ready.len() >= reserve.pending {
            reserve.pending = 0;
        }
        accepted
    }

    /// Number of bytes ready for full-strength extraction.
    pub fn available(&self) -> usize {
        self.reserve.lock().ready.len()
    }

    /// Largest generation hint not yet met by the reserve, or 0.
    pub fn pending_request(&self) -> usize {
        self.reserve.lock().pending
    }

    /// Total number of generation hints received.
    pub fn hint_count(&self) -> u64 {
        self.reserve.lock().hints
    }
}

impl Default for ReservoirPool {
    fn default() -> Self {
        Self::new(ReservoirConfig::default())
    }
}

impl EntropyPool for ReservoirPool {
    fn try_extract(&self, dest: &mut [u8]) -> Result<(), EntropyError> {
        if dest.len() > self.config.capacity {
            return Err(EntropyError::Oversized);
        }
        let mut reserve = self.reserve.lock();
        if reserve.ready.len() < dest.len() {
            return Err(EntropyError::Exhausted);
        }
        reserve.take_front(dest);
        Ok(())
    }

    fn extract(&self, dest: &mut [u8]) -> bool {
        let mut reserve = self.reserve.lock();
        if reserve.ready.len() >= dest.len() {
            reserve.take_front(dest);
            return true;
        }

        // Not enough for a full-strength answer: fold the remainder into the
        // ratchet and stretch it. The reserve is wiped in place so its
        // allocation is reused instead of being freed with entropy in it.
        let mut hasher = blake3::Hasher::new_derive_key(DEGRADED_CONTEXT);
        hasher.update(&*reserve.chain);
        hasher.update(&reserve.degraded_counter.to_le_bytes());
        hasher.update(&reserve.ready);
        let folded = reserve.ready.len();
        reserve.ready.zeroize();

        let mut xof = hasher.finalize_xof();
        xof.fill(&mut *reserve.chain);
        xof.fill(dest);
        reserve.degraded_counter = reserve.degraded_counter.wrapping_add(1);

        log::trace!(
            "reservoir degraded extract: {} bytes from {} ready",
            dest.len(),
            folded
        );
        false
    }

    fn request_more(&self, bytes: usize) {
        let mut reserve = self.reserve.lock();
        reserve.hints = reserve.hints.saturating_add(1);
        if bytes > reserve.ready.len() && bytes > reserve.pending {
            reserve.pending = bytes;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_with(bytes: &[u8]) -> ReservoirPool {
        let pool = ReservoirPool::default();
        assert_eq!(pool.add_entropy(bytes), bytes.len());
        pool
    }

    #[test]
    fn test_try_extract_drains_front_first() {
        let pool = pool_with(&[1, 2, 3, 4, 5]);

        let mut buf = [0u8; 2];
        pool.try_extract(&mut buf).unwrap();
        assert_eq!(buf, [1, 2]);
        pool.try_extract(&mut buf).unwrap();
        assert_eq!(buf, [3, 4]);
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_try_extract_short_leaves_reserve_untouched() {
        let pool = pool_with(&[0xAA; 16]);

        let mut buf = [0u8; 32];
        assert_eq!(pool.try_extract(&mut buf), Err(EntropyError::Exhausted));
        assert_eq!(buf, [0u8; 32]);
        assert_eq!(pool.available(), 16);
    }

    #[test]
    fn test_try_extract_oversized() {
        let pool = ReservoirPool::new(ReservoirConfig { capacity: 8 });
        let mut buf = [0u8; 9];
        assert_eq!(pool.try_extract(&mut buf), Err(EntropyError::Oversized));
    }

    #[test]
    fn test_capacity_drops_excess() {
        let pool = ReservoirPool::new(ReservoirConfig { capacity: 4 });
        assert_eq!(pool.add_entropy(&[9; 10]), 4);
        assert_eq!(pool.add_entropy(&[9; 1]), 0);
        assert_eq!(pool.available(), 4);
    }

    #[test]
    fn test_extract_full_strength() {
        let pool = pool_with(&[7; 8]);
        let mut buf = [0u8; 8];
        assert!(pool.extract(&mut buf));
        assert_eq!(buf, [7; 8]);
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_extract_degraded_consumes_reserve() {
        let pool = pool_with(&[1, 2, 3]);
        let mut first = [0u8; 16];
        assert!(!pool.extract(&mut first));
        assert_eq!(pool.available(), 0);

        // The ratchet moves even with nothing new to fold in.
        let mut second = [0u8; 16];
        assert!(!pool.extract(&mut second));
        assert_ne!(first, second);
    }

    #[test]
    fn test_degraded_extract_keeps_reserve_allocation() {
        let pool = pool_with(&[1, 2, 3]);
        let capacity = pool.reserve.lock().ready.capacity();
        assert!(capacity >= 4096);

        let mut buf = [0u8; 16];
        assert!(!pool.extract(&mut buf));
        assert_eq!(pool.reserve.lock().ready.capacity(), capacity);

        // Refilling must not reallocate (and free) the reserve.
        for _ in 0..64 {
            pool.add_entropy(&[0xAB; 16]);
        }
        assert_eq!(pool.available(), 1024);
        assert_eq!(pool.reserve.lock().ready.capacity(), capacity);
    }

    #[test]
    fn test_request_more_tracks_pending() {
        let pool = ReservoirPool::default();
        pool.request_more(16);
        pool.request_more(8);
        assert_eq!(pool.pending_request(), 16);
        assert_eq!(pool.hint_count(), 2);

        pool.add_entropy(&[0; 10]);
        assert_eq!(pool.pending_request(), 16);
        pool.add_entropy(&[0; 6]);
        assert_eq!(pool.pending_request(), 0);
    }
}
