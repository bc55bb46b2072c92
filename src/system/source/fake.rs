//! Closure-driven sources for tests and benchmarks.
//!
//! ```
//! use std::time::Instant;
//! use vitals::system::source::fake::FakeSource;
//! use vitals::system::source::{MemoryReading, MemorySource};
//!
//! let mut source = FakeSource::new(|| {
//!     Ok(MemoryReading {
//!         timestamp: Instant::now(),
//!         total_bytes: 8,
//!         used_bytes: 4,
//!         available_bytes: 4,
//!         swap_total_bytes: 0,
//!         swap_used_bytes: 0,
//!     })
//! });
//! assert_eq!(source.read_memory().unwrap().used_bytes, 4);
//! ```

use std::collections::VecDeque;

use super::{
    CpuReading, CpuSource, HostReading, HostSource, MemoryReading, MemorySource, NetworkReading,
    NetworkSource, ProcessReading, ProcessSource,
};
use crate::system::error::CollectError;

pub struct FakeSource<F> {
    read: F,
}

impl<F> FakeSource<F> {
    pub fn new(read: F) -> Self {
        Self { read }
    }
}

/// Replays `script` in order, then fails every read.
pub fn scripted<R: Send + 'static>(
    script: Vec<Result<R, CollectError>>,
) -> FakeSource<impl FnMut() -> Result<R, CollectError> + Send + 'static> {
    let mut script: VecDeque<_> = script.into();
    FakeSource::new(move || {
        script
            .pop_front()
            .unwrap_or_else(|| Err(CollectError::transient("script exhausted")))
    })
}

macro_rules! fake_source {
    ($trait:ident, $method:ident, $reading:ty) => {
        impl<F> $trait for FakeSource<F>
        where
            F: FnMut() -> Result<$reading, CollectError> + Send + 'static,
        {
            fn $method(&mut self) -> Result<$reading, CollectError> {
                (self.read)()
            }
        }
    };
}

fake_source!(CpuSource, read_cpu, CpuReading);
fake_source!(MemorySource, read_memory, MemoryReading);
fake_source!(NetworkSource, read_network, NetworkReading);
fake_source!(ProcessSource, read_processes, ProcessReading);
fake_source!(HostSource, read_host, HostReading);
