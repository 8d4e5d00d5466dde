//! Distributor counters.
//!
//! Updated under the registry lock and copied out as a snapshot, so every
//! field of one snapshot is mutually consistent.

/// Snapshot of distributor activity since construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DistributorStats {
    /// Sinks created.
    pub created: u64,
    /// Sinks destroyed.
    pub destroyed: u64,
    /// Callbacks run.
    pub deliveries: u64,
    /// Bytes handed to callbacks.
    pub bytes_delivered: u64,
    /// Sinks moved back to the tail after being scheduled mid-callback.
    pub requeues: u64,
    /// Passes that stopped on a head sink the pool could not satisfy.
    pub stalls: u64,
    /// Synchronous requests served at full strength.
    pub sync_full: u64,
    /// Synchronous requests served degraded (and queued for a follow-up).
    pub sync_degraded: u64,
    /// Times a destroy had to wait for a callback to finish.
    pub destroy_waits: u64,
}

impl DistributorStats {
    /// Sinks created and not yet destroyed.
    pub fn live(&self) -> u64 {
        self.created.saturating_sub(self.destroyed)
    }

    #[cfg(feature = "std")]
    pub(crate) fn record_delivery(&mut self, bytes: usize) {
        self.deliveries = self.deliveries.saturating_add(1);
        self.bytes_delivered = self.bytes_delivered.saturating_add(bytes as u64);
    }
}
