use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::time::Instant;

use serde::Serialize;

/// Metric domains, one collector and one bus slot each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Cpu,
    Memory,
    Network,
    Processes,
    Host,
}

impl Domain {
    pub const ALL: [Domain; 5] = [
        Domain::Cpu,
        Domain::Memory,
        Domain::Network,
        Domain::Processes,
        Domain::Host,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Domain::Cpu => "cpu",
            Domain::Memory => "memory",
            Domain::Network => "network",
            Domain::Processes => "processes",
            Domain::Host => "host",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Domain::Cpu => 0,
            Domain::Memory => 1,
            Domain::Network => 2,
            Domain::Processes => 3,
            Domain::Host => 4,
        }
    }
}

/// Monotonic capture time of a snapshot.
pub trait Timestamped {
    fn timestamp(&self) -> Instant;
}

macro_rules! timestamped {
    ($($ty:ty),+ $(,)?) => {
        $(impl Timestamped for $ty {
            fn timestamp(&self) -> Instant {
                self.timestamp
            }
        })+
    };
}

timestamped!(
    CpuSnapshot,
    MemorySnapshot,
    NetworkSnapshot,
    ProcessSnapshot,
    HostSnapshot
);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoreUsage {
    pub core_id: usize,
    pub utilization_percent: f64,
    /// `None` when no sensor could be read for this core.
    pub temperature_celsius: Option<f32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CpuSnapshot {
    pub per_core: Vec<CoreUsage>,
    pub aggregate_utilization_percent: f64,
    pub load_average: [f64; 3],
    pub frequency_mhz: u64,
    #[serde(skip)]
    pub timestamp: Instant,
}

impl CpuSnapshot {
    pub fn core_count(&self) -> usize {
        self.per_core.len()
    }

    pub fn hottest_core_celsius(&self) -> Option<f32> {
        self.per_core
            .iter()
            .filter_map(|c| c.temperature_celsius)
            .fold(None, |acc, t| Some(acc.map_or(t, |a: f32| a.max(t))))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MemorySnapshot {
    pub used_bytes: u64,
    pub total_bytes: u64,
    pub available_bytes: u64,
    pub swap_used_bytes: u64,
    pub swap_total_bytes: u64,
    #[serde(skip)]
    pub timestamp: Instant,
}

impl MemorySnapshot {
    pub fn used_ratio(&self) -> f64 {
        ratio(self.used_bytes, self.total_bytes)
    }

    pub fn swap_ratio(&self) -> f64 {
        ratio(self.swap_used_bytes, self.swap_total_bytes)
    }
}

fn ratio(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (used as f64 / total as f64).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InterfaceRates {
    pub rx_rate_bps: f64,
    pub tx_rate_bps: f64,
    pub rx_total_bytes: u64,
    pub tx_total_bytes: u64,
    /// First IPv4 address bound to the interface.
    pub ipv4: Option<Ipv4Addr>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkSnapshot {
    pub interfaces: BTreeMap<String, InterfaceRates>,
    #[serde(skip)]
    pub timestamp: Instant,
}

impl NetworkSnapshot {
    pub fn total_rx_rate_bps(&self) -> f64 {
        self.interfaces.values().map(|i| i.rx_rate_bps).sum()
    }

    pub fn total_tx_rate_bps(&self) -> f64 {
        self.interfaces.values().map(|i| i.tx_rate_bps).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Cpu,
    Memory,
    Pid,
    Name,
}

impl SortKey {
    pub fn next(self) -> Self {
        match self {
            SortKey::Cpu => SortKey::Memory,
            SortKey::Memory => SortKey::Pid,
            SortKey::Pid => SortKey::Name,
            SortKey::Name => SortKey::Cpu,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortKey::Cpu => "CPU",
            SortKey::Memory => "Memory",
            SortKey::Pid => "PID",
            SortKey::Name => "Name",
        }
    }

    pub fn from_str_config(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "memory" | "mem" => SortKey::Memory,
            "pid" => SortKey::Pid,
            "name" => SortKey::Name,
            _ => SortKey::Cpu,
        }
    }

    /// Natural order for the key: heaviest first for cpu/memory, ascending for pid/name.
    /// Ties fall back to pid so the ordering is total.
    pub fn compare(self, a: &ProcessEntry, b: &ProcessEntry) -> Ordering {
        let primary = match self {
            SortKey::Cpu => b
                .cpu_percent
                .partial_cmp(&a.cpu_percent)
                .unwrap_or(Ordering::Equal),
            SortKey::Memory => b.memory_bytes.cmp(&a.memory_bytes),
            SortKey::Pid => Ordering::Equal,
            SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        };
        primary.then_with(|| a.pid.cmp(&b.pid))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f64,
    pub memory_bytes: u64,
    pub status: String,
    pub owner: Option<String>,
    pub disk_read_bps: f64,
    pub disk_write_bps: f64,
    /// `None` where the platform does not list a process's threads.
    pub threads: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessSnapshot {
    /// Ordered by `sort` (reversed when `reverse` is set), filtered and truncated.
    pub entries: Vec<ProcessEntry>,
    /// Processes seen in the scan before filtering and truncation.
    pub total_count: usize,
    pub sort: SortKey,
    pub reverse: bool,
    #[serde(skip)]
    pub timestamp: Instant,
}

#[derive(Debug, Clone, Serialize)]
pub struct HostSnapshot {
    pub hostname: String,
    pub os_version: String,
    pub kernel_version: String,
    pub cpu_brand: String,
    pub logical_cores: usize,
    /// Seconds since the Unix epoch.
    pub boot_time: u64,
    pub uptime_seconds: u64,
    /// Primary non-loopback IPv4 address.
    pub ip_address: Option<Ipv4Addr>,
    /// Usage of the filesystem mounted at `/`, or of the largest disk without one.
    pub root_disk: Option<DiskUsage>,
    #[serde(skip)]
    pub timestamp: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiskUsage {
    pub mount_point: String,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
}

impl DiskUsage {
    pub fn used_ratio(&self) -> f64 {
        ratio(self.used_bytes, self.total_bytes)
    }
}
