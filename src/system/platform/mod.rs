//! Per-OS extensions the `sysinfo` API does not expose.

pub trait PlatformExtensions {
    /// Cumulative busy time per logical core in milliseconds, in core order.
    fn core_busy_ms() -> Option<Vec<u64>>;
}

#[cfg(target_os = "linux")]
mod linux;
#[cfg(not(target_os = "linux"))]
mod other;

#[cfg(target_os = "linux")]
use linux as platform_impl;
#[cfg(not(target_os = "linux"))]
use other as platform_impl;

pub fn core_busy_ms() -> Option<Vec<u64>> {
    platform_impl::Platform::core_busy_ms()
}

/// Parses the per-core lines of `/proc/stat` into busy milliseconds.
///
/// Busy time is user + nice + system + irq + softirq + steal; guest time is already
/// folded into user by the kernel.
pub fn parse_proc_stat(contents: &str, ticks_per_second: u64) -> Option<Vec<u64>> {
    let ticks_per_second = ticks_per_second.max(1);
    let mut cores = Vec::new();
    for line in contents.lines() {
        let Some(rest) = line.strip_prefix("cpu") else {
            continue;
        };
        // The aggregate line is "cpu  ..." with no index.
        if !rest.starts_with(|c: char| c.is_ascii_digit()) {
            continue;
        }
        let fields: Vec<u64> = rest
            .split_whitespace()
            .skip(1)
            .map(|f| f.parse().ok())
            .collect::<Option<Vec<_>>>()?;
        if fields.len() < 4 {
            return None;
        }
        let field = |i: usize| fields.get(i).copied().unwrap_or(0);
        let busy_ticks = field(0) + field(1) + field(2) + field(5) + field(6) + field(7);
        cores.push(busy_ticks * 1000 / ticks_per_second);
    }
    if cores.is_empty() { None } else { Some(cores) }
}
