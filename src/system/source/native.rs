use std::net::{IpAddr, Ipv4Addr};
use std::time::{Instant, SystemTime};

use sysinfo::{
    Components, CpuRefreshKind, Disks, NetworkData, Networks, ProcessRefreshKind,
    ProcessesToUpdate, System, ThreadKind, UpdateKind, Users,
};
use tracing::debug;

use super::{
    CoreReading, CpuReading, CpuSource, DiskReading, HostReading, HostSource, InterfaceCounters,
    MemoryReading, MemorySource, NetworkReading, NetworkSource, ProcessReading, ProcessRecord,
    ProcessSource,
};
use crate::system::error::{CollectError, StartupError};
use crate::system::platform;

const USER_REFRESH_EVERY: u32 = 30;

/// Where per-core busy time comes from. Chosen once per run: the two bases count
/// from different origins, so mixing them would read as a huge burst or a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusyBase {
    /// Kernel counters since boot.
    Kernel,
    /// sysinfo usage integrated over wall time since start-up.
    Integrated,
}

/// Cumulative busy milliseconds per core on a fixed [`BusyBase`].
#[derive(Debug)]
pub struct BusyCounters {
    base: BusyBase,
    integrated_ms: Vec<f64>,
    last_read: Instant,
}

impl BusyCounters {
    pub fn new(base: BusyBase, core_count: usize, now: Instant) -> Self {
        Self {
            base,
            integrated_ms: vec![0.0; core_count],
            last_read: now,
        }
    }

    pub fn base(&self) -> BusyBase {
        self.base
    }

    /// Busy counters for this tick. A kernel base that cannot be read, or that
    /// reports a different core count, fails the tick instead of falling back.
    pub fn next(
        &mut self,
        kernel: Option<Vec<u64>>,
        usages: &[f32],
        now: Instant,
    ) -> Result<Vec<u64>, CollectError> {
        match self.base {
            BusyBase::Kernel => {
                let busy =
                    kernel.ok_or_else(|| CollectError::transient("kernel cpu counters unreadable"))?;
                if busy.len() != usages.len() {
                    return Err(CollectError::transient(format!(
                        "kernel reports {} cores, expected {}",
                        busy.len(),
                        usages.len()
                    )));
                }
                Ok(busy)
            }
            BusyBase::Integrated => {
                let elapsed_ms =
                    now.saturating_duration_since(self.last_read).as_secs_f64() * 1000.0;
                self.last_read = now;
                self.integrated_ms.resize(usages.len(), 0.0);
                for (busy, usage) in self.integrated_ms.iter_mut().zip(usages) {
                    *busy += f64::from(usage.clamp(0.0, 100.0)) / 100.0 * elapsed_ms;
                }
                Ok(self.integrated_ms.iter().map(|b| *b as u64).collect())
            }
        }
    }
}

pub struct NativeCpu {
    sys: System,
    components: Components,
    busy: BusyCounters,
}

impl NativeCpu {
    pub fn new() -> Result<Self, StartupError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(StartupError::MetricsUnavailable(format!(
                "{} is not supported by the metrics backend",
                std::env::consts::OS
            )));
        }
        let mut sys = System::new();
        sys.refresh_cpu_list(CpuRefreshKind::everything());
        let core_count = sys.cpus().len();
        if core_count == 0 {
            return Err(StartupError::MetricsUnavailable(
                "no CPUs reported".to_string(),
            ));
        }

        let base = match platform::core_busy_ms() {
            Some(busy) if busy.len() == core_count => BusyBase::Kernel,
            _ => BusyBase::Integrated,
        };
        debug!(?base, core_count, "cpu busy counter base selected");

        Ok(NativeCpu {
            sys,
            components: Components::new_with_refreshed_list(),
            busy: BusyCounters::new(base, core_count, Instant::now()),
        })
    }
}

impl CpuSource for NativeCpu {
    fn read_cpu(&mut self) -> Result<CpuReading, CollectError> {
        self.sys
            .refresh_cpu_specifics(CpuRefreshKind::nothing().with_cpu_usage().with_frequency());
        self.components.refresh(false);
        let timestamp = Instant::now();

        let usages: Vec<f32> = self.sys.cpus().iter().map(|c| c.cpu_usage()).collect();
        if usages.is_empty() {
            return Err(CollectError::transient("cpu list is empty"));
        }
        let frequency_mhz = self.sys.cpus().first().map(|c| c.frequency()).unwrap_or(0);

        let kernel = match self.busy.base() {
            BusyBase::Kernel => platform::core_busy_ms(),
            BusyBase::Integrated => None,
        };
        let busy = self.busy.next(kernel, &usages, timestamp)?;

        let sensors: Vec<(String, Option<f32>)> = self
            .components
            .list()
            .iter()
            .map(|c| (c.label().to_string(), c.temperature()))
            .collect();
        let temperatures = core_temperatures(&sensors, busy.len());

        let cores = busy
            .into_iter()
            .zip(temperatures)
            .map(|(busy_ms, temperature)| CoreReading {
                busy_ms,
                temperature_celsius: temperature.ok(),
            })
            .collect();

        let load = System::load_average();
        Ok(CpuReading {
            timestamp,
            cores,
            load_average: [load.one, load.five, load.fifteen],
            frequency_mhz,
        })
    }
}

/// Maps sensor labels to logical cores.
///
/// Per-core labels ("Core 3", "coretemp Core 3") win; otherwise a package-level
/// sensor ("Package id 0", "Tctl", "cpu_thermal") is applied to every core.
pub fn core_temperatures(
    sensors: &[(String, Option<f32>)],
    core_count: usize,
) -> Vec<Result<f32, CollectError>> {
    let mut per_core: Vec<Option<f32>> = vec![None; core_count];
    let mut package = None;

    for (label, temperature) in sensors {
        let Some(temperature) = temperature.filter(|t| t.is_finite()) else {
            continue;
        };
        let label = label.to_lowercase();
        if let Some(index) = core_index(&label) {
            if let Some(slot) = per_core.get_mut(index) {
                *slot = Some(temperature);
            }
        } else if ["package", "tctl", "tdie", "cpu"]
            .iter()
            .any(|k| label.contains(k))
        {
            package.get_or_insert(temperature);
        }
    }

    per_core
        .into_iter()
        .enumerate()
        .map(|(core, t)| {
            t.or(package)
                .ok_or_else(|| CollectError::sensor(format!("no temperature sensor for core {core}")))
        })
        .collect()
}

fn core_index(label: &str) -> Option<usize> {
    let rest = &label[label.rfind("core")? + "core".len()..];
    rest.trim_start()
        .split(|c: char| !c.is_ascii_digit())
        .next()?
        .parse()
        .ok()
}

pub struct NativeMemory {
    sys: System,
}

impl Default for NativeMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeMemory {
    pub fn new() -> Self {
        NativeMemory { sys: System::new() }
    }
}

impl MemorySource for NativeMemory {
    fn read_memory(&mut self) -> Result<MemoryReading, CollectError> {
        self.sys.refresh_memory();
        let total_bytes = self.sys.total_memory();
        if total_bytes == 0 {
            return Err(CollectError::transient("total memory reported as zero"));
        }
        Ok(MemoryReading {
            timestamp: Instant::now(),
            total_bytes,
            used_bytes: self.sys.used_memory(),
            available_bytes: self.sys.available_memory(),
            swap_total_bytes: self.sys.total_swap(),
            swap_used_bytes: self.sys.used_swap(),
        })
    }
}

fn first_ipv4(data: &NetworkData) -> Option<Ipv4Addr> {
    data.ip_networks().iter().find_map(|net| match net.addr {
        IpAddr::V4(ip) => Some(ip),
        IpAddr::V6(_) => None,
    })
}

pub struct NativeNetwork {
    networks: Networks,
}

impl Default for NativeNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeNetwork {
    pub fn new() -> Self {
        NativeNetwork {
            networks: Networks::new_with_refreshed_list(),
        }
    }
}

impl NetworkSource for NativeNetwork {
    fn read_network(&mut self) -> Result<NetworkReading, CollectError> {
        // Drops interfaces that vanished since the last refresh.
        self.networks.refresh(true);
        let interfaces = self
            .networks
            .iter()
            .map(|(name, data)| InterfaceCounters {
                name: name.clone(),
                rx_bytes: data.total_received(),
                tx_bytes: data.total_transmitted(),
                ipv4: first_ipv4(data),
            })
            .collect();
        Ok(NetworkReading {
            timestamp: Instant::now(),
            interfaces,
        })
    }
}

pub struct NativeProcesses {
    sys: System,
    users: Users,
    reads: u32,
}

impl Default for NativeProcesses {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeProcesses {
    pub fn new() -> Self {
        NativeProcesses {
            sys: System::new(),
            users: Users::new_with_refreshed_list(),
            reads: 0,
        }
    }

    fn owner_name(&self, process: &sysinfo::Process) -> Option<String> {
        let uid = process.user_id()?;
        Some(
            self.users
                .get_user_by_id(uid)
                .map(|u| u.name().to_string())
                .unwrap_or_else(|| format!("{uid:?}")),
        )
    }
}

impl ProcessSource for NativeProcesses {
    fn read_processes(&mut self) -> Result<ProcessReading, CollectError> {
        self.reads = self.reads.wrapping_add(1);
        if self.reads.is_multiple_of(USER_REFRESH_EVERY) {
            self.users.refresh();
        }

        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing()
                .with_memory()
                .with_cpu()
                .with_disk_usage()
                .with_tasks()
                .with_user(UpdateKind::OnlyIfNotSet),
        );
        let timestamp = Instant::now();

        if self.sys.processes().is_empty() {
            return Err(CollectError::transient("process table is empty"));
        }

        // Userland threads are listed as tasks of their process, not as rows.
        let processes = self
            .sys
            .processes()
            .iter()
            .filter(|(_, process)| process.thread_kind() != Some(ThreadKind::Userland))
            .map(|(pid, process)| {
                let disk = process.disk_usage();
                ProcessRecord {
                    pid: pid.as_u32(),
                    name: process.name().to_string_lossy().into_owned(),
                    cpu_time_ms: process.accumulated_cpu_time(),
                    memory_bytes: process.memory(),
                    status: process.status().to_string(),
                    owner: self.owner_name(process),
                    threads: process.tasks().map(|tasks| tasks.len()),
                    disk_read_total: disk.total_read_bytes,
                    disk_written_total: disk.total_written_bytes,
                }
            })
            .collect();

        Ok(ProcessReading {
            timestamp,
            processes,
        })
    }
}

pub struct NativeHost {
    sys: System,
    disks: Disks,
    networks: Networks,
}

impl Default for NativeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeHost {
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_list(CpuRefreshKind::nothing());
        NativeHost {
            sys,
            disks: Disks::new_with_refreshed_list(),
            networks: Networks::new_with_refreshed_list(),
        }
    }
}

impl HostSource for NativeHost {
    fn read_host(&mut self) -> Result<HostReading, CollectError> {
        let boot_time = System::boot_time();
        if boot_time == 0 {
            return Err(CollectError::transient("boot time unavailable"));
        }
        // Mounts and addresses come and go, so both lists are rebuilt.
        self.disks.refresh(true);
        self.networks.refresh(true);
        let disks = self
            .disks
            .iter()
            .map(|disk| DiskReading {
                mount_point: disk.mount_point().to_path_buf(),
                total_bytes: disk.total_space(),
                available_bytes: disk.available_space(),
            })
            .collect();
        let ipv4_addresses = self
            .networks
            .iter()
            .filter_map(|(name, data)| Some((name.clone(), first_ipv4(data)?)))
            .collect();
        Ok(HostReading {
            timestamp: Instant::now(),
            read_at: SystemTime::now(),
            hostname: System::host_name(),
            os_version: System::long_os_version(),
            kernel_version: System::kernel_version(),
            cpu_brand: self
                .sys
                .cpus()
                .first()
                .map(|c| c.brand().trim().to_string())
                .filter(|b| !b.is_empty()),
            logical_cores: self.sys.cpus().len(),
            boot_time,
            ipv4_addresses,
            disks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sensor(label: &str, t: f32) -> (String, Option<f32>) {
        (label.to_string(), Some(t))
    }

    #[test]
    fn per_core_labels_map_to_cores() {
        let sensors = vec![
            sensor("coretemp Package id 0", 60.0),
            sensor("coretemp Core 0", 41.0),
            sensor("coretemp Core 1", 43.5),
        ];
        let temps = core_temperatures(&sensors, 3);
        assert_eq!(temps[0], Ok(41.0));
        assert_eq!(temps[1], Ok(43.5));
        // No per-core sensor: package reading is used.
        assert_eq!(temps[2], Ok(60.0));
    }

    #[test]
    fn missing_sensors_are_unavailable_not_fatal() {
        let sensors = vec![("nvme Composite".to_string(), Some(35.0)), ("Core 0".to_string(), None)];
        let temps = core_temperatures(&sensors, 2);
        assert!(temps.iter().all(|t| matches!(t, Err(CollectError::SensorUnavailable(_)))));
    }

    #[test]
    fn out_of_range_core_label_is_ignored() {
        let temps = core_temperatures(&[sensor("Core 9", 50.0)], 2);
        assert!(temps.iter().all(Result::is_err));
    }

    #[test]
    fn kernel_base_fails_the_tick_instead_of_falling_back() {
        let t0 = Instant::now();
        let mut counters = BusyCounters::new(BusyBase::Kernel, 2, t0);
        let usages = [5.0, 5.0];

        assert_eq!(
            counters.next(Some(vec![34_500_000, 12_000_000]), &usages, t0),
            Ok(vec![34_500_000, 12_000_000])
        );
        assert!(matches!(
            counters.next(None, &usages, t0 + Duration::from_secs(1)),
            Err(CollectError::TransientRead(_))
        ));
        // A core went offline: the kernel lists one fewer.
        assert!(matches!(
            counters.next(Some(vec![34_500_020]), &usages, t0 + Duration::from_secs(2)),
            Err(CollectError::TransientRead(_))
        ));
        assert_eq!(
            counters.next(Some(vec![34_500_030, 12_000_030]), &usages, t0 + Duration::from_secs(3)),
            Ok(vec![34_500_030, 12_000_030])
        );
        assert_eq!(counters.base(), BusyBase::Kernel);
    }

    #[test]
    fn integrated_base_ignores_kernel_counters() {
        let t0 = Instant::now();
        let mut counters = BusyCounters::new(BusyBase::Integrated, 2, t0);
        let busy = counters
            .next(Some(vec![34_500_000, 34_500_000]), &[50.0, 100.0], t0 + Duration::from_secs(2))
            .unwrap();
        assert_eq!(busy, vec![1000, 2000]);

        let busy = counters
            .next(None, &[250.0, -3.0], t0 + Duration::from_secs(3))
            .unwrap();
        // Usage is clamped to [0, 100] before integrating.
        assert_eq!(busy, vec![2000, 2000]);
    }

    #[test]
    fn native_memory_reads_do_not_panic() {
        let _ = NativeMemory::new().read_memory();
    }
}
