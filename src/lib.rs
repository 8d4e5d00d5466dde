//! Entropy sink distribution.
//!
//! Consumers register a [`sink::Sink`] for a fixed number of random bytes and
//! ask for delivery. A `RandomDistributor` (with `std`) drains its FIFO of waiting
//! sinks whenever the backing [`entropy::EntropyPool`] gains entropy, running
//! each consumer's callback with the registry lock released.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod config;
pub mod entropy;
pub mod sink;

pub use config::{DistributorConfig, ReservoirConfig};
pub use entropy::{EntropyError, EntropyPool, reservoir::ReservoirPool};
pub use sink::{stats::DistributorStats, Sink, SinkError, SinkState, MAX_BYTES};

#[cfg(feature = "std")]
pub use sink::{distributor::RandomDistributor, SinkHandle};
