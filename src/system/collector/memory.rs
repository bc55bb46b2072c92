use tracing::debug;

use super::Collector;
use crate::system::error::CollectError;
use crate::system::snapshot::MemorySnapshot;
use crate::system::source::{MemoryReading, MemorySource};

/// Gauges only; no rate state.
pub struct MemoryCollector {
    source: Box<dyn MemorySource>,
}

impl MemoryCollector {
    pub fn new(source: Box<dyn MemorySource>) -> Self {
        Self { source }
    }
}

impl Collector for MemoryCollector {
    type Snapshot = MemorySnapshot;

    fn poll(&mut self) -> Result<MemorySnapshot, CollectError> {
        let reading = self.source.read_memory()?;
        Ok(clamp_reading(reading))
    }
}

fn clamp_reading(reading: MemoryReading) -> MemorySnapshot {
    if reading.used_bytes > reading.total_bytes || reading.swap_used_bytes > reading.swap_total_bytes
    {
        debug!(
            used = reading.used_bytes,
            total = reading.total_bytes,
            swap_used = reading.swap_used_bytes,
            swap_total = reading.swap_total_bytes,
            "memory gauges out of range, clamping"
        );
    }
    MemorySnapshot {
        used_bytes: reading.used_bytes.min(reading.total_bytes),
        total_bytes: reading.total_bytes,
        available_bytes: reading.available_bytes.min(reading.total_bytes),
        swap_used_bytes: reading.swap_used_bytes.min(reading.swap_total_bytes),
        swap_total_bytes: reading.swap_total_bytes,
        timestamp: reading.timestamp,
    }
}
