use super::{PlatformExtensions, parse_proc_stat};

pub struct Platform;

impl PlatformExtensions for Platform {
    fn core_busy_ms() -> Option<Vec<u64>> {
        let contents = std::fs::read_to_string("/proc/stat").ok()?;
        parse_proc_stat(&contents, clock_ticks())
    }
}

fn clock_ticks() -> u64 {
    // USER_HZ; sysconf returns -1 when the value is indeterminate.
    // SAFETY: sysconf only reads a constant name and touches no caller memory.
    let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if ticks > 0 { ticks as u64 } else { 100 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_ticks_is_positive() {
        // 100 on nearly every kernel; never the -1 sentinel passed through.
        assert!(clock_ticks() > 0);
    }

    #[test]
    fn live_counters_are_monotonic() {
        let Some(first) = Platform::core_busy_ms() else {
            return;
        };
        let second = Platform::core_busy_ms().unwrap();
        assert_eq!(first.len(), second.len());
        assert!(first.iter().zip(&second).all(|(a, b)| b >= a));
    }
}
