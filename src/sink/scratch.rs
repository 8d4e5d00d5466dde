//! Scratch space for one distribution pass.
//!
//! Bytes pulled from the pool live here only while a single callback runs,
//! then are wiped.

use zeroize::{Zeroize, ZeroizeOnDrop};

use super::MAX_BYTES;
use crate::entropy::{EntropyError, EntropyPool};

/// Fixed-size carrier for extracted bytes.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ScratchBuffer {
    bytes: [u8; MAX_BYTES],
}

impl ScratchBuffer {
    pub fn new() -> Self {
        Self {
            bytes: [0u8; MAX_BYTES],
        }
    }

    /// Fills the first `len` bytes from `pool` without blocking.
    ///
    /// # Panics
    /// If `len` exceeds [`MAX_BYTES`].
    pub fn fill_from<P: EntropyPool + ?Sized>(
        &mut self,
        pool: &P,
        len: usize,
    ) -> Result<(), EntropyError> {
        pool.try_extract(&mut self.bytes[..len])
    }

    /// The first `len` bytes.
    pub fn bytes(&self, len: usize) -> &[u8] {
        &self.bytes[..len]
    }

    /// Wipes the first `len` bytes.
    pub fn scrub(&mut self, len: usize) {
        self.bytes[..len].zeroize();
    }

    /// True if no byte of the buffer is set.
    pub fn is_clear(&self) -> bool {
        self.bytes.iter().all(|&b| b == 0)
    }
}

impl Default for ScratchBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::reservoir::ReservoirPool;

    #[test]
    fn test_fill_then_scrub() {
        let pool = ReservoirPool::default();
        pool.add_entropy(&[0x5A; MAX_BYTES]);

        let mut scratch = ScratchBuffer::new();
        scratch.fill_from(&pool, 24).unwrap();
        assert_eq!(scratch.bytes(24), &[0x5A; 24][..]);
        assert!(!scratch.is_clear());

        scratch.scrub(24);
        assert!(scratch.is_clear());
    }

    #[test]
    fn test_failed_fill_leaves_buffer_clear() {
        let pool = ReservoirPool::default();
        pool.add_entropy(&[1; 4]);

        let mut scratch = ScratchBuffer::new();
        assert_eq!(scratch.fill_from(&pool, 8), Err(EntropyError::Exhausted));
        assert!(scratch.is_clear());
    }

    #[test]
    #[should_panic(expected = "out of range for slice of length 32")]
    fn test_oversized_fill_panics() {
        let pool = ReservoirPool::default();
        let mut scratch = ScratchBuffer::new();
        let _ = scratch.fill_from(&pool, MAX_BYTES + 1);
    }
}
