//! Shared sink records.

extern crate alloc;
use alloc::boxed::Box;
use alloc::sync::Arc;
use core::fmt;

use super::state::{SinkState, StateCell};
use super::Sink;

struct SinkRecord {
    id: u64,
    byte_count: usize,
    consumer: Box<dyn Sink>,
    state: StateCell,
}

/// Reference to a registered sink.
///
/// Clones refer to the same sink. The byte count and the consumer never
/// change after creation and are read without any lock.
#[derive(Clone)]
pub struct SinkHandle {
    record: Arc<SinkRecord>,
}

impl SinkHandle {
    pub(crate) fn new(id: u64, byte_count: usize, consumer: Box<dyn Sink>) -> Self {
        Self {
            record: Arc::new(SinkRecord {
                id,
                byte_count,
                consumer,
                state: StateCell::new(SinkState::Idle),
            }),
        }
    }

    /// Identifier assigned at creation, unique per distributor.
    pub fn id(&self) -> u64 {
        self.record.id
    }

    /// Number of bytes every delivery carries.
    pub fn byte_count(&self) -> usize {
        self.record.byte_count
    }

    /// Snapshot of the lifecycle state. May be stale by the time it is read.
    pub fn state(&self) -> SinkState {
        self.record.state.load()
    }

    /// Caller must hold the registry lock.
    pub(crate) fn set_state(&self, state: SinkState) {
        self.record.state.store(state);
    }

    pub(crate) fn deliver(&self, bytes: &[u8]) {
        debug_assert_eq!(bytes.len(), self.record.byte_count);
        self.record.consumer.deliver(bytes);
    }

    pub(crate) fn same_sink(&self, other: &SinkHandle) -> bool {
        Arc::ptr_eq(&self.record, &other.record)
    }
}

impl fmt::Debug for SinkHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkHandle")
            .field("id", &self.id())
            .field("byte_count", &self.byte_count())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_clones_share_state() {
        let handle = SinkHandle::new(7, 16, Box::new(|_: &[u8]| {}));
        let other = handle.clone();

        handle.set_state(SinkState::Queued);
        assert_eq!(other.state(), SinkState::Queued);
        assert!(handle.same_sink(&other));
        assert_eq!(other.id(), 7);
        assert_eq!(other.byte_count(), 16);
    }

    #[test]
    fn test_distinct_sinks() {
        let a = SinkHandle::new(1, 8, Box::new(|_: &[u8]| {}));
        let b = SinkHandle::new(2, 8, Box::new(|_: &[u8]| {}));
        assert!(!a.same_sink(&b));
    }

    #[test]
    fn test_deliver_reaches_consumer() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let handle = SinkHandle::new(
            1,
            4,
            Box::new(move |bytes: &[u8]| {
                counter.fetch_add(bytes.len(), Ordering::SeqCst);
            }),
        );
        handle.deliver(&[1, 2, 3, 4]);
        assert_eq!(seen.load(Ordering::SeqCst), 4);
    }
}
