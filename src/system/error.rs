use thiserror::Error;

/// Per-tick failures. These stay inside the collector that produced them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollectError {
    #[error("transient read failure: {0}")]
    TransientRead(String),

    #[error("sensor unavailable: {0}")]
    SensorUnavailable(String),
}

impl CollectError {
    pub fn transient<S: Into<String>>(msg: S) -> Self {
        CollectError::TransientRead(msg.into())
    }

    pub fn sensor<S: Into<String>>(msg: S) -> Self {
        CollectError::SensorUnavailable(msg.into())
    }
}

/// Outcome of a process action, surfaced only to the caller that asked for it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    #[error("process {0} not found")]
    NotFound(u32),

    #[error("permission denied for process {0}")]
    PermissionDenied(u32),

    #[error("failed to signal process {pid}: {message}")]
    Other { pid: u32, message: String },
}

impl ProcessError {
    pub fn pid(&self) -> u32 {
        match self {
            ProcessError::NotFound(pid) | ProcessError::PermissionDenied(pid) => *pid,
            ProcessError::Other { pid, .. } => *pid,
        }
    }
}

/// The metrics API cannot be used at all. Aborts startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StartupError {
    #[error("platform metrics unavailable: {0}")]
    MetricsUnavailable(String),
}
