use crate::system::error::ProcessError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminateSignal {
    /// SIGTERM, or the closest request-to-exit the platform has.
    Graceful,
    /// SIGKILL.
    Force,
}

impl TerminateSignal {
    pub fn name(self) -> &'static str {
        match self {
            TerminateSignal::Graceful => "SIGTERM",
            TerminateSignal::Force => "SIGKILL",
        }
    }
}

/// Signals one process. Pid 0 and pids outside the signed range are never sent
/// anywhere, since the OS reads them as process groups.
pub fn terminate(pid: u32, signal: TerminateSignal) -> Result<(), ProcessError> {
    if pid == 0 || i32::try_from(pid).is_err() {
        return Err(ProcessError::NotFound(pid));
    }
    send(pid, signal)
}

#[cfg(unix)]
fn send(pid: u32, signal: TerminateSignal) -> Result<(), ProcessError> {
    let sig = match signal {
        TerminateSignal::Graceful => libc::SIGTERM,
        TerminateSignal::Force => libc::SIGKILL,
    };
    // SAFETY: kill(2) has no memory-safety preconditions; pid is a positive i32.
    let rc = unsafe { libc::kill(pid as libc::pid_t, sig) };
    if rc == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    match err.raw_os_error() {
        Some(libc::ESRCH) => Err(ProcessError::NotFound(pid)),
        Some(libc::EPERM) => Err(ProcessError::PermissionDenied(pid)),
        _ => Err(ProcessError::Other {
            pid,
            message: err.to_string(),
        }),
    }
}

#[cfg(not(unix))]
fn send(pid: u32, signal: TerminateSignal) -> Result<(), ProcessError> {
    use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, Signal, System};

    let sysinfo_pid = Pid::from_u32(pid);
    let mut sys = System::new();
    sys.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[sysinfo_pid]),
        true,
        ProcessRefreshKind::nothing(),
    );
    let process = sys
        .process(sysinfo_pid)
        .ok_or(ProcessError::NotFound(pid))?;
    let sent = match signal {
        TerminateSignal::Graceful => process.kill_with(Signal::Term).unwrap_or_else(|| process.kill()),
        TerminateSignal::Force => process.kill(),
    };
    if sent {
        Ok(())
    } else {
        Err(ProcessError::Other {
            pid,
            message: format!("failed to send {} (permission denied?)", signal.name()),
        })
    }
}
