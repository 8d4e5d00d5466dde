//! Sink distributor.
//!
//! Owns the FIFO of queued sinks, the registry lock and the condition variable
//! `destroy` sleeps on. Callbacks always run with the lock released; the sink's
//! state machine reconciles whatever happened in the meantime once the lock is
//! taken back.
//!
//! # Guarantees
//! - **Mutual exclusion**: a sink is in flight at most once, so its callback
//!   never runs concurrently with itself.
//! - **Coalescing**: any number of schedules during one callback produce
//!   exactly one further delivery.
//! - **Safe teardown**: `destroy` returns only once no callback for the sink is
//!   running or pending.
//! - **Head-of-line blocking**: a pass stops at the first queued sink the pool
//!   cannot satisfy. Smaller requests behind it wait for the next pass.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use super::handle::SinkHandle;
use super::scratch::ScratchBuffer;
use super::state::SinkState;
use super::stats::DistributorStats;
use super::{Sink, SinkError, MAX_BYTES};
use crate::config::DistributorConfig;
use crate::entropy::EntropyPool;

struct Registry {
    queue: VecDeque<SinkHandle>,
    stats: DistributorStats,
    next_id: u64,
    /// Whether the scratch buffer was clear as each delivery settled.
    #[cfg(test)]
    scrubbed: Vec<bool>,
}

impl Registry {
    fn remove(&mut self, handle: &SinkHandle) {
        if let Some(pos) = self.queue.iter().position(|s| s.same_sink(handle)) {
            self.queue.remove(pos);
        }
    }
}

/// Feeds queued sinks from an entropy pool.
pub struct RandomDistributor<P: EntropyPool> {
    pool: Arc<P>,
    config: DistributorConfig,
    registry: Mutex<Registry>,
    /// Broadcast after every delivery settles.
    settled: Condvar,
}

impl<P: EntropyPool> RandomDistributor<P> {
    /// Creates a distributor with an empty queue.
    pub fn new(pool: Arc<P>, config: DistributorConfig) -> Self {
        Self {
            pool,
            config,
            registry: Mutex::new(Registry {
                queue: VecDeque::new(),
                stats: DistributorStats::default(),
                next_id: 0,
                #[cfg(test)]
                scrubbed: Vec::new(),
            }),
            settled: Condvar::new(),
        }
    }

    /// The pool this distributor draws from.
    pub fn pool(&self) -> &Arc<P> {
        &self.pool
    }

    /// Number of sinks currently waiting in the FIFO.
    pub fn queue_len(&self) -> usize {
        self.lock().queue.len()
    }

    /// Snapshot of the activity counters.
    pub fn stats(&self) -> DistributorStats {
        self.lock().stats
    }

    /// Registers a sink that will receive `byte_count` bytes per delivery.
    ///
    /// # Panics
    /// If `byte_count` exceeds [`MAX_BYTES`].
    pub fn create<S: Sink + 'static>(&self, byte_count: usize, consumer: S) -> SinkHandle {
        match self.try_create(byte_count, consumer) {
            Ok(handle) => handle,
            Err(err) => panic!("{}", err),
        }
    }

    /// Like [`create`](Self::create), but reports an oversized request.
    pub fn try_create<S: Sink + 'static>(
        &self,
        byte_count: usize,
        consumer: S,
    ) -> Result<SinkHandle, SinkError> {
        if byte_count > MAX_BYTES {
            return Err(SinkError::TooManyBytes {
                requested: byte_count,
                max: MAX_BYTES,
            });
        }

        let id = {
            let mut registry = self.lock();
            registry.next_id += 1;
            registry.stats.created += 1;
            registry.next_id
        };
        log::debug!("sink {} created for {} bytes", id, byte_count);
        Ok(SinkHandle::new(id, byte_count, Box::new(consumer)))
    }

    /// Tears a sink down, first waiting out any callback in flight.
    ///
    /// A queued sink is simply unlinked; it never sees another delivery.
    ///
    /// # Panics
    /// If the sink was already destroyed through another handle.
    pub fn destroy(&self, handle: SinkHandle) {
        let mut registry = self.lock();
        loop {
            match handle.state() {
                SinkState::Idle => break,
                SinkState::Queued => {
                    registry.remove(&handle);
                    handle.set_state(SinkState::Idle);
                }
                SinkState::InFlight | SinkState::Requeued => {
                    registry.stats.destroy_waits += 1;
                    registry = self
                        .settled
                        .wait(registry)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                SinkState::Dead => {
                    drop(registry);
                    panic!("sink {} destroyed twice", handle.id());
                }
            }
        }
        handle.set_state(SinkState::Dead);
        registry.stats.destroyed += 1;
        drop(registry);

        log::debug!("sink {} destroyed", handle.id());
    }

    /// Asks for an asynchronous delivery.
    ///
    /// Returns at once if a delivery is already due. Scheduling a sink whose
    /// callback is running makes it run once more afterwards.
    ///
    /// # Panics
    /// If the sink was destroyed.
    pub fn schedule(&self, handle: &SinkHandle) {
        match handle.state() {
            SinkState::Queued | SinkState::Requeued => return,
            SinkState::Dead => panic!("schedule of destroyed sink {}", handle.id()),
            SinkState::Idle | SinkState::InFlight => {}
        }

        let mut registry = self.lock();
        self.enqueue(&mut registry, handle);
    }

    /// Fills `buf` right away.
    ///
    /// If the pool could not answer at full strength, the sink is also queued
    /// so it receives a proper delivery once enough entropy has accumulated.
    ///
    /// # Returns
    /// `true` if `buf` holds full-strength entropy.
    ///
    /// # Panics
    /// If `buf` does not match the sink's byte count, or the sink was destroyed.
    pub fn request(&self, handle: &SinkHandle, buf: &mut [u8]) -> bool {
        assert_eq!(
            buf.len(),
            handle.byte_count(),
            "request size does not match sink {}",
            handle.id()
        );
        assert!(
            handle.state() != SinkState::Dead,
            "request on destroyed sink {}",
            handle.id()
        );

        let mut registry = self.lock();
        let full_entropy = self.pool.extract(buf);
        if full_entropy {
            registry.stats.sync_full += 1;
        } else {
            registry.stats.sync_degraded += 1;
            self.enqueue(&mut registry, handle);
        }
        drop(registry);

        if !full_entropy {
            log::warn!(
                "sink {}: {} bytes served below full entropy, follow-up queued",
                handle.id(),
                buf.len()
            );
        }
        full_entropy
    }

    /// Delivers to queued sinks in FIFO order for as long as the pool keeps up.
    ///
    /// Called whenever the pool has mixed in fresh entropy. Stops at the first
    /// sink the pool cannot satisfy.
    pub fn distribute(&self) {
        let mut scratch = ScratchBuffer::new();
        let mut registry = self.lock();

        loop {
            let Some(head) = registry.queue.front() else {
                break;
            };
            let len = head.byte_count();
            if let Err(err) = scratch.fill_from(&*self.pool, len) {
                log::trace!("sink {} waits for {} bytes: {}", head.id(), len, err);
                registry.stats.stalls += 1;
                break;
            }
            let Some(sink) = registry.queue.pop_front() else {
                break;
            };
            debug_assert_eq!(sink.state(), SinkState::Queued);
            sink.set_state(SinkState::InFlight);
            drop(registry);

            let mut flight = Flight {
                distributor: self,
                sink,
                scratch: &mut scratch,
                len,
                landed: false,
            };
            flight.deliver();
            registry = flight.land();
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enqueue(&self, registry: &mut Registry, handle: &SinkHandle) {
        self.pool
            .request_more(handle.byte_count().max(self.config.request_floor));

        let from = handle.state();
        let to = from.on_enqueue();
        if from == SinkState::Idle {
            registry.queue.push_back(handle.clone());
        }
        handle.set_state(to);
        log::trace!("sink {}: {} -> {}", handle.id(), from, to);
    }
}

/// One callback in progress.
///
/// Landing settles the sink and wakes `destroy` callers. If the callback
/// unwinds, drop does the same so the sink is never stranded in flight.
struct Flight<'d, 's, P: EntropyPool> {
    distributor: &'d RandomDistributor<P>,
    sink: SinkHandle,
    scratch: &'s mut ScratchBuffer,
    len: usize,
    landed: bool,
}

impl<'d, 's, P: EntropyPool> Flight<'d, 's, P> {
    fn deliver(&mut self) {
        self.sink.deliver(self.scratch.bytes(self.len));
    }

    fn land(mut self) -> MutexGuard<'d, Registry> {
        self.landed = true;
        self.settle()
    }

    fn settle(&mut self) -> MutexGuard<'d, Registry> {
        self.scratch.scrub(self.len);

        let mut registry = self.distributor.lock();
        #[cfg(test)]
        registry.scrubbed.push(self.scratch.is_clear());

        let from = self.sink.state();
        let to = from.after_delivery();
        self.sink.set_state(to);
        registry.stats.record_delivery(self.len);
        if to == SinkState::Queued {
            registry.queue.push_back(self.sink.clone());
            registry.stats.requeues += 1;
        }
        log::trace!("sink {}: {} -> {}", self.sink.id(), from, to);

        self.distributor.settled.notify_all();
        registry
    }
}

impl<'d, 's, P: EntropyPool> Drop for Flight<'d, 's, P> {
    fn drop(&mut self) {
        if !self.landed {
            log::warn!("sink {} callback unwound", self.sink.id());
            drop(self.settle());
        }
    }
}
