//! Raw OS reads, one trait per domain.
//!
//! Every reading carries the monotonic instant it was taken at. Sources return raw
//! cumulative counters and gauges; all differencing and clamping happens in the
//! collectors.

pub mod fake;
pub mod native;

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::{Instant, SystemTime};

use super::error::{CollectError, StartupError};

#[derive(Debug, Clone, PartialEq)]
pub struct CoreReading {
    /// Cumulative busy time of this core, in milliseconds.
    pub busy_ms: u64,
    pub temperature_celsius: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CpuReading {
    pub timestamp: Instant,
    pub cores: Vec<CoreReading>,
    pub load_average: [f64; 3],
    pub frequency_mhz: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryReading {
    pub timestamp: Instant,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub available_bytes: u64,
    pub swap_total_bytes: u64,
    pub swap_used_bytes: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceCounters {
    pub name: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub ipv4: Option<Ipv4Addr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkReading {
    pub timestamp: Instant,
    pub interfaces: Vec<InterfaceCounters>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRecord {
    pub pid: u32,
    pub name: String,
    /// Cumulative CPU time across all threads, in milliseconds.
    pub cpu_time_ms: u64,
    pub memory_bytes: u64,
    pub status: String,
    pub owner: Option<String>,
    pub disk_read_total: u64,
    pub disk_written_total: u64,
    pub threads: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessReading {
    pub timestamp: Instant,
    /// Processes that vanished during the scan are simply absent.
    pub processes: Vec<ProcessRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostReading {
    pub timestamp: Instant,
    /// Wall-clock time of the read, used to derive uptime from boot time.
    pub read_at: SystemTime,
    pub hostname: Option<String>,
    pub os_version: Option<String>,
    pub kernel_version: Option<String>,
    pub cpu_brand: Option<String>,
    pub logical_cores: usize,
    /// Seconds since the Unix epoch.
    pub boot_time: u64,
    /// IPv4 addresses by interface name.
    pub ipv4_addresses: Vec<(String, Ipv4Addr)>,
    pub disks: Vec<DiskReading>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiskReading {
    pub mount_point: PathBuf,
    pub total_bytes: u64,
    pub available_bytes: u64,
}

pub trait CpuSource: Send + 'static {
    fn read_cpu(&mut self) -> Result<CpuReading, CollectError>;
}

pub trait MemorySource: Send + 'static {
    fn read_memory(&mut self) -> Result<MemoryReading, CollectError>;
}

pub trait NetworkSource: Send + 'static {
    fn read_network(&mut self) -> Result<NetworkReading, CollectError>;
}

pub trait ProcessSource: Send + 'static {
    fn read_processes(&mut self) -> Result<ProcessReading, CollectError>;
}

pub trait HostSource: Send + 'static {
    fn read_host(&mut self) -> Result<HostReading, CollectError>;
}

/// One source per collector; none of them are shared.
pub struct Sources {
    pub cpu: Box<dyn CpuSource>,
    pub memory: Box<dyn MemorySource>,
    pub network: Box<dyn NetworkSource>,
    pub processes: Box<dyn ProcessSource>,
    pub host: Box<dyn HostSource>,
}

impl Sources {
    /// Sources backed by the host OS. Fails only when no metric could ever be read.
    pub fn native() -> Result<Self, StartupError> {
        let cpu = native::NativeCpu::new()?;
        Ok(Sources {
            cpu: Box::new(cpu),
            memory: Box::new(native::NativeMemory::new()),
            network: Box::new(native::NativeNetwork::new()),
            processes: Box::new(native::NativeProcesses::new()),
            host: Box::new(native::NativeHost::new()),
        })
    }
}
