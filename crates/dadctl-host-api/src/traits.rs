//! Host collaborator traits

use chrono::{DateTime, Local};
use dadctl_api::{RunningProcess, ViolationReason};
use thiserror::Error;

/// Errors from host adapter operations
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Process listing failed: {0}")]
    ListFailed(String),

    #[error("Stop failed: {0}")]
    StopFailed(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// Source of the current local time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// Enumerates the processes currently running on the host
pub trait ProcessLister: Send + Sync {
    /// Snapshot of running processes. Processes whose executable path
    /// cannot be resolved are omitted.
    fn list_processes(&self) -> HostResult<Vec<RunningProcess>>;
}

/// Stops the processes of a violating activity
pub trait ProcessTerminator: Send + Sync {
    /// Terminate every process in `processes`, all matched by `activity`.
    ///
    /// Called at most once per activity per scan. A process that already
    /// exited is not an error. Failures for individual processes must not
    /// prevent the remaining ones from being terminated.
    fn terminate(
        &self,
        activity: &str,
        processes: &[RunningProcess],
        reason: ViolationReason,
    ) -> HostResult<()>;
}
