//! Entropy pool boundary.
//!
//! The distributor never mixes or whitens anything itself. It only needs three
//! things from whatever accumulates entropy: a non-blocking extract that fails
//! when too little is ready, a blocking extract that always produces output and
//! reports its strength, and a hint that more should be generated.
//!
//! [`reservoir::ReservoirPool`] is a small in-memory implementation for hosts
//! without a kernel pool.

use core::fmt;

pub mod reservoir;

/// Outcome of a failed non-blocking extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntropyError {
    /// Fewer bytes are ready than were asked for.
    Exhausted,
    /// The request can never be satisfied by this pool.
    Oversized,
}

impl fmt::Display for EntropyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntropyError::Exhausted => write!(f, "Not enough entropy ready"),
            EntropyError::Oversized => write!(f, "Request exceeds pool capacity"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EntropyError {}

/// A source of fresh random bytes as seen by the sink distributor.
///
/// Implementations are called with the distributor's registry lock held, so
/// they must not call back into the distributor.
pub trait EntropyPool: Send + Sync {
    /// Fills all of `dest` with full-strength entropy, or fails without
    /// consuming anything.
    fn try_extract(&self, dest: &mut [u8]) -> Result<(), EntropyError>;

    /// Fills all of `dest`, falling back to degraded output if the pool is not
    /// fully seeded.
    ///
    /// # Returns
    /// `true` if `dest` is backed by full-strength entropy.
    fn extract(&self, dest: &mut [u8]) -> bool;

    /// Hints that `bytes` more bytes should be generated. Never blocks.
    fn request_more(&self, bytes: usize);
}
