use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use vitals::system::error::ProcessError;
use vitals::system::kill::{TerminateSignal, terminate};
use vitals::system::source::ProcessSource;
use vitals::system::source::native::NativeProcesses;

fn spawn_long_lived_child() -> Child {
    #[cfg(windows)]
    let mut cmd = {
        let mut c = Command::new("powershell");
        c.args([
            "-NoProfile",
            "-NonInteractive",
            "-Command",
            "Start-Sleep -Seconds 30",
        ]);
        c
    };

    #[cfg(not(windows))]
    let mut cmd = {
        let mut c = Command::new("sh");
        c.args(["-c", "sleep 30"]);
        c
    };

    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn child process")
}

/// Polls the native process source until `pid` shows up in a scan.
fn wait_for_pid(source: &mut NativeProcesses, pid: u32, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if let Ok(reading) = source.read_processes()
            && reading.processes.iter().any(|p| p.pid == pid)
        {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(50));
    }
}

fn wait_for_exit(child: &mut Child, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => return,
            Ok(None) if Instant::now() < deadline => thread::sleep(Duration::from_millis(50)),
            Ok(None) => {
                let _ = child.kill();
                panic!("child process did not exit before timeout");
            }
            Err(err) => {
                let _ = child.kill();
                panic!("failed waiting for child exit: {err}");
            }
        }
    }
}

#[test]
fn terminate_nonexistent_pid_returns_not_found() {
    // A valid pid_t above every kernel pid limit: the OS itself reports no such process.
    let missing = i32::MAX as u32;
    assert_eq!(
        terminate(missing, TerminateSignal::Graceful),
        Err(ProcessError::NotFound(missing))
    );
}

#[cfg(unix)]
#[test]
fn terminate_foreign_process_is_permission_denied() {
    // SAFETY: geteuid has no preconditions and cannot fail.
    if unsafe { libc::geteuid() } == 0 {
        eprintln!("skipping: running as root, the signal would be delivered");
        return;
    }
    let mut source = NativeProcesses::new();
    let init_owner = source
        .read_processes()
        .ok()
        .and_then(|reading| reading.processes.into_iter().find(|p| p.pid == 1))
        .and_then(|init| init.owner);
    if init_owner.as_deref() != Some("root") {
        eprintln!("skipping: pid 1 is not visibly owned by root ({init_owner:?})");
        return;
    }

    assert_eq!(
        terminate(1, TerminateSignal::Graceful),
        Err(ProcessError::PermissionDenied(1))
    );
}

#[test]
fn terminate_spawned_child_makes_it_exit() {
    let mut child = spawn_long_lived_child();
    let pid = child.id();

    let mut source = NativeProcesses::new();
    if !wait_for_pid(&mut source, pid, Duration::from_secs(3)) {
        let _ = child.kill();
        panic!("child process PID {pid} never appeared in a process scan");
    }

    let signal = if cfg!(windows) {
        TerminateSignal::Force
    } else {
        TerminateSignal::Graceful
    };
    if let Err(err) = terminate(pid, signal) {
        let _ = child.kill();
        panic!("terminate reported failure: {err}");
    }

    wait_for_exit(&mut child, Duration::from_secs(5));
}
