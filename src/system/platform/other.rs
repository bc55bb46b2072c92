use super::PlatformExtensions;

pub struct Platform;

impl PlatformExtensions for Platform {
    fn core_busy_ms() -> Option<Vec<u64>> {
        // No cumulative per-core counters; the native source integrates sysinfo usage instead.
        None
    }
}
