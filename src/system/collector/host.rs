use std::net::Ipv4Addr;
use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};

use super::Collector;
use crate::system::error::CollectError;
use crate::system::snapshot::{DiskUsage, HostSnapshot};
use crate::system::source::{DiskReading, HostReading, HostSource};

const UNKNOWN: &str = "unknown";

/// Slow-moving host facts. No rate state.
pub struct HostCollector {
    source: Box<dyn HostSource>,
}

impl HostCollector {
    pub fn new(source: Box<dyn HostSource>) -> Self {
        Self { source }
    }
}

fn uptime_seconds(reading: &HostReading) -> u64 {
    let booted = UNIX_EPOCH + Duration::from_secs(reading.boot_time);
    reading
        .read_at
        .duration_since(booted)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn or_unknown(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// The filesystem at `/`; without one (Windows), the largest disk.
fn root_disk(disks: &[DiskReading]) -> Option<DiskUsage> {
    let disk = disks
        .iter()
        .find(|d| d.mount_point == Path::new("/"))
        .or_else(|| disks.iter().max_by_key(|d| d.total_bytes))?;
    let free_bytes = disk.available_bytes.min(disk.total_bytes);
    Some(DiskUsage {
        mount_point: disk.mount_point.display().to_string(),
        total_bytes: disk.total_bytes,
        used_bytes: disk.total_bytes - free_bytes,
        free_bytes,
    })
}

/// First routable-looking address, taking interfaces in name order.
fn primary_ipv4(addresses: &[(String, Ipv4Addr)]) -> Option<Ipv4Addr> {
    let mut candidates: Vec<&(String, Ipv4Addr)> = addresses
        .iter()
        .filter(|(_, ip)| !ip.is_loopback() && !ip.is_link_local() && !ip.is_unspecified())
        .collect();
    candidates.sort_by(|a, b| a.0.cmp(&b.0));
    candidates.first().map(|(_, ip)| *ip)
}

impl Collector for HostCollector {
    type Snapshot = HostSnapshot;

    fn poll(&mut self) -> Result<HostSnapshot, CollectError> {
        let reading = self.source.read_host()?;
        let uptime_seconds = uptime_seconds(&reading);
        Ok(HostSnapshot {
            hostname: or_unknown(reading.hostname),
            os_version: or_unknown(reading.os_version),
            kernel_version: or_unknown(reading.kernel_version),
            cpu_brand: or_unknown(reading.cpu_brand),
            logical_cores: reading.logical_cores,
            boot_time: reading.boot_time,
            uptime_seconds,
            ip_address: primary_ipv4(&reading.ipv4_addresses),
            root_disk: root_disk(&reading.disks),
            timestamp: reading.timestamp,
        })
    }
}
