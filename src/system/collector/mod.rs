//! One collector per domain. A collector owns its source and all of its rate state;
//! the supervisor drives `poll` on a fixed cadence and publishes the result.

pub mod cpu;
pub mod host;
pub mod memory;
pub mod network;
pub mod process;

pub use cpu::CpuCollector;
pub use host::HostCollector;
pub use memory::MemoryCollector;
pub use network::NetworkCollector;
pub use process::{ProcessCollector, ProcessControl, ProcessView};

use super::bus::Publish;
use super::error::CollectError;

pub trait Collector: Send + 'static {
    type Snapshot: Publish;

    /// One tick: read the source and derive a fresh snapshot.
    fn poll(&mut self) -> Result<Self::Snapshot, CollectError>;
}

/// Milliseconds of busy time per second of wall time, as a percentage.
pub(crate) fn busy_rate_to_percent(busy_ms_per_sec: f64) -> f64 {
    busy_ms_per_sec / 1000.0 * 100.0
}
