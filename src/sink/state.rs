//! Sink lifecycle.
//!
//! # States
//! - **Idle**: not queued, no callback running. Initial state.
//! - **Queued**: waiting in the FIFO for the next distribution pass.
//! - **InFlight**: the callback is running with the lock released.
//! - **Requeued**: scheduled again while in flight; goes back to the tail
//!   once the callback returns.
//! - **Dead**: destroyed. Terminal; any further use is a caller bug.

use core::fmt;
#[cfg(feature = "std")]
use core::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SinkState {
    Idle = 0,
    Queued = 1,
    InFlight = 2,
    Requeued = 3,
    Dead = 4,
}

impl SinkState {
    /// State after a schedule or degraded request.
    ///
    /// # Panics
    /// On a dead sink.
    pub fn on_enqueue(self) -> SinkState {
        match self {
            SinkState::Idle | SinkState::Queued => SinkState::Queued,
            SinkState::InFlight | SinkState::Requeued => SinkState::Requeued,
            SinkState::Dead => panic!("enqueue of a dead sink"),
        }
    }

    /// State once the callback has returned.
    ///
    /// # Panics
    /// Unless the sink was in flight.
    pub fn after_delivery(self) -> SinkState {
        match self {
            SinkState::InFlight => SinkState::Idle,
            SinkState::Requeued => SinkState::Queued,
            other => panic!("delivery finished on a sink in state {}", other),
        }
    }

    /// Whether a delivery is already due, so scheduling again changes nothing.
    pub fn is_pending(self) -> bool {
        matches!(self, SinkState::Queued | SinkState::Requeued)
    }

    #[cfg(feature = "std")]
    fn from_raw(raw: u8) -> SinkState {
        match raw {
            0 => SinkState::Idle,
            1 => SinkState::Queued,
            2 => SinkState::InFlight,
            3 => SinkState::Requeued,
            _ => SinkState::Dead,
        }
    }
}

impl fmt::Display for SinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SinkState::Idle => "idle",
            SinkState::Queued => "queued",
            SinkState::InFlight => "in-flight",
            SinkState::Requeued => "requeued",
            SinkState::Dead => "dead",
        };
        f.write_str(name)
    }
}

/// Atomic storage for a [`SinkState`].
///
/// Stores happen only under the registry lock. Loads may happen anywhere.
#[cfg(feature = "std")]
pub(crate) struct StateCell(AtomicU8);

#[cfg(feature = "std")]
impl StateCell {
    pub(crate) const fn new(state: SinkState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub(crate) fn load(&self) -> SinkState {
        SinkState::from_raw(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, state: SinkState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enqueue_transitions() {
        assert_eq!(SinkState::Idle.on_enqueue(), SinkState::Queued);
        assert_eq!(SinkState::Queued.on_enqueue(), SinkState::Queued);
        assert_eq!(SinkState::InFlight.on_enqueue(), SinkState::Requeued);
        assert_eq!(SinkState::Requeued.on_enqueue(), SinkState::Requeued);
    }

    #[test]
    fn test_delivery_transitions() {
        assert_eq!(SinkState::InFlight.after_delivery(), SinkState::Idle);
        assert_eq!(SinkState::Requeued.after_delivery(), SinkState::Queued);
    }

    #[test]
    #[should_panic(expected = "dead sink")]
    fn test_dead_cannot_enqueue() {
        SinkState::Dead.on_enqueue();
    }

    #[test]
    #[should_panic(expected = "state queued")]
    fn test_queued_cannot_finish_delivery() {
        SinkState::Queued.after_delivery();
    }

    #[test]
    fn test_pending() {
        assert!(SinkState::Queued.is_pending());
        assert!(SinkState::Requeued.is_pending());
        assert!(!SinkState::Idle.is_pending());
        assert!(!SinkState::InFlight.is_pending());
    }
}
