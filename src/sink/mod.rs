//! Entropy sinks.
//!
//! A sink is a registered consumer waiting for a fixed number of fresh random
//! bytes. Its lifecycle is tracked by [`SinkState`]; all transitions happen
//! under the distributor's registry lock.
//!
//! # Components
//! - `state`: the five-state lifecycle and its transition table.
//! - `handle`: the shared sink record handed to consumers (`std`).
//! - `scratch`: the fixed buffer that carries bytes to a callback.
//! - `stats`: counters kept alongside the queue.
//! - `distributor`: the queue, the condition variable and the five operations
//!   (`std`).

use core::fmt;

#[cfg(feature = "std")]
pub mod handle;
pub mod scratch;
pub mod state;
pub mod stats;

#[cfg(feature = "std")]
pub mod distributor;

#[cfg(feature = "std")]
pub use handle::SinkHandle;
pub use state::SinkState;

/// Upper bound on the number of bytes a single sink may ask for.
pub const MAX_BYTES: usize = 32;

/// A consumer of freshly generated random bytes.
pub trait Sink: Send + Sync {
    /// Receives exactly the sink's configured number of bytes.
    ///
    /// Runs without the registry lock held; it may call back into the
    /// distributor, e.g. to schedule itself again. The slice is scrubbed as
    /// soon as this returns.
    fn deliver(&self, bytes: &[u8]);
}

impl<F> Sink for F
where
    F: Fn(&[u8]) + Send + Sync,
{
    fn deliver(&self, bytes: &[u8]) {
        self(bytes)
    }
}

/// Errors from the checked sink constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkError {
    /// The requested byte count exceeds [`MAX_BYTES`].
    TooManyBytes { requested: usize, max: usize },
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::TooManyBytes { requested, max } => {
                write!(f, "Sink asks for {} bytes, limit is {}", requested, max)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SinkError {}
