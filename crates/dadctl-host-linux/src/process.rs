//! Process enumeration and termination

use dadctl_api::{RunningProcess, ViolationReason};
use dadctl_host_api::{HostError, HostResult, ProcessLister, ProcessTerminator};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::sync::Mutex;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use tracing::{debug, info, warn};

/// Lists running processes through `sysinfo`
pub struct SysinfoProcessLister {
    system: Mutex<System>,
    refresh_kind: ProcessRefreshKind,
}

impl SysinfoProcessLister {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
            refresh_kind: ProcessRefreshKind::nothing().with_exe(UpdateKind::OnlyIfNotSet),
        }
    }
}

impl Default for SysinfoProcessLister {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessLister for SysinfoProcessLister {
    fn list_processes(&self) -> HostResult<Vec<RunningProcess>> {
        let mut system = self
            .system
            .lock()
            .map_err(|_| HostError::ListFailed("process table lock poisoned".into()))?;

        system.refresh_processes_specifics(ProcessesToUpdate::All, true, self.refresh_kind);

        let own_pid = std::process::id();
        let mut processes = Vec::new();
        let mut unresolved = 0usize;

        for (pid, process) in system.processes() {
            let pid = pid.as_u32();
            if pid == own_pid {
                continue;
            }

            // Kernel threads and processes of other users without privileges
            let Some(exe) = process.exe() else {
                unresolved += 1;
                continue;
            };

            processes.push(RunningProcess::new(pid, exe.to_string_lossy()));
        }

        processes.sort_by_key(|p| p.pid);
        debug!(
            count = processes.len(),
            unresolved, "Listed running processes"
        );

        Ok(processes)
    }
}

/// Terminates processes by sending them a signal, SIGKILL by default
#[derive(Debug, Clone, Copy)]
pub struct SignalTerminator {
    signal: Signal,
}

impl SignalTerminator {
    pub fn new() -> Self {
        Self::with_signal(Signal::SIGKILL)
    }

    pub fn with_signal(signal: Signal) -> Self {
        Self { signal }
    }

    /// Send the signal to one process; a process that is already gone is
    /// not an error
    pub fn signal_process(&self, pid: u32) -> HostResult<()> {
        let raw = i32::try_from(pid)
            .map_err(|_| HostError::StopFailed(format!("pid {} out of range", pid)))?;

        match signal::kill(Pid::from_raw(raw), self.signal) {
            Ok(()) => {
                debug!(pid, signal = %self.signal, "Signal sent");
                Ok(())
            }
            Err(nix::errno::Errno::ESRCH) => {
                debug!(pid, "Process already gone");
                Ok(())
            }
            Err(nix::errno::Errno::EPERM) => Err(HostError::PermissionDenied(format!(
                "not allowed to signal pid {}",
                pid
            ))),
            Err(e) => Err(HostError::StopFailed(format!(
                "Failed to send {} to pid {}: {}",
                self.signal, pid, e
            ))),
        }
    }
}

impl Default for SignalTerminator {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTerminator for SignalTerminator {
    fn terminate(
        &self,
        activity: &str,
        processes: &[RunningProcess],
        reason: ViolationReason,
    ) -> HostResult<()> {
        let mut failed = 0usize;

        for process in processes {
            info!(
                activity = %activity,
                pid = process.pid,
                path = %process.path,
                reason = %reason,
                "Killing process"
            );

            if let Err(e) = self.signal_process(process.pid) {
                warn!(pid = process.pid, error = %e, "Failed to kill process");
                failed += 1;
            }
        }

        if failed > 0 {
            return Err(HostError::StopFailed(format!(
                "{} of {} processes of '{}' could not be killed",
                failed,
                processes.len(),
                activity
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use std::process::{Command, Stdio};

    fn spawn_sleeper() -> std::process::Child {
        Command::new("sleep")
            .arg("30")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap()
    }

    #[test]
    fn test_lister_sees_child_and_skips_self() {
        let mut child = spawn_sleeper();
        let lister = SysinfoProcessLister::new();

        let processes = lister.list_processes().unwrap();
        let found = processes.iter().find(|p| p.pid == child.id());

        assert!(found.is_some_and(|p| !p.path.is_empty()));
        assert!(processes.iter().all(|p| p.pid != std::process::id()));

        child.kill().unwrap();
        child.wait().unwrap();
    }

    #[test]
    fn test_terminate_sends_sigkill() {
        let mut child = spawn_sleeper();
        let process = RunningProcess::new(child.id(), "sleep");

        SignalTerminator::new()
            .terminate("Sleep", &[process], ViolationReason::OutsideTimeRange)
            .unwrap();

        let status = child.wait().unwrap();
        assert_eq!(status.signal(), Some(Signal::SIGKILL as i32));
    }

    #[test]
    fn test_terminate_already_exited_is_ok() {
        let mut child = spawn_sleeper();
        let pid = child.id();
        child.kill().unwrap();
        child.wait().unwrap();

        let terminator = SignalTerminator::new();
        assert!(terminator.signal_process(pid).is_ok());
    }
}
