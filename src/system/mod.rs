//! Sampling and aggregation engine.
//!
//! Collectors poll the OS through [`source`] traits, turn cumulative counters into
//! rates with [`rate::RateEstimator`], and publish immutable snapshots to the
//! [`bus::SnapshotBus`]. The [`supervisor::Supervisor`] owns their lifecycles.

pub mod bus;
pub mod collector;
pub mod error;
pub mod kill;
pub mod platform;
pub mod rate;
pub mod sample;
pub mod snapshot;
pub mod source;
pub mod supervisor;
