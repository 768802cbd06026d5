//! Mock collaborators for testing

use chrono::{DateTime, Local};
use dadctl_api::{RunningProcess, ViolationReason};
use std::sync::Mutex;
use std::time::Duration;

use crate::{Clock, HostError, HostResult, ProcessLister, ProcessTerminator};

/// Clock returning a settable instant
#[derive(Debug)]
pub struct MockClock {
    now: Mutex<DateTime<Local>>,
}

impl MockClock {
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Local>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::from_std(by).unwrap();
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock().unwrap()
    }
}

/// Process lister returning a settable process table
#[derive(Debug, Default)]
pub struct MockProcessLister {
    processes: Mutex<Vec<RunningProcess>>,

    /// Configure listing to fail
    pub fail_list: Mutex<bool>,
}

impl MockProcessLister {
    pub fn new(processes: Vec<RunningProcess>) -> Self {
        Self {
            processes: Mutex::new(processes),
            fail_list: Mutex::new(false),
        }
    }

    pub fn set_processes(&self, processes: Vec<RunningProcess>) {
        *self.processes.lock().unwrap() = processes;
    }

    /// Simulate a process being started
    pub fn spawn(&self, pid: u32, path: &str) {
        self.processes
            .lock()
            .unwrap()
            .push(RunningProcess::new(pid, path));
    }

    pub fn set_fail_list(&self, fail: bool) {
        *self.fail_list.lock().unwrap() = fail;
    }
}

impl ProcessLister for MockProcessLister {
    fn list_processes(&self) -> HostResult<Vec<RunningProcess>> {
        if *self.fail_list.lock().unwrap() {
            return Err(HostError::ListFailed("Mock listing failure".into()));
        }
        Ok(self.processes.lock().unwrap().clone())
    }
}

/// One recorded termination request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Termination {
    pub activity: String,
    pub processes: Vec<RunningProcess>,
    pub reason: ViolationReason,
}

impl Termination {
    pub fn pids(&self) -> Vec<u32> {
        self.processes.iter().map(|p| p.pid).collect()
    }
}

/// Terminator that records requests instead of killing anything
#[derive(Debug, Default)]
pub struct RecordingTerminator {
    terminations: Mutex<Vec<Termination>>,

    /// Configure terminate to fail (the request is still recorded)
    pub fail_stop: Mutex<bool>,
}

impl RecordingTerminator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn terminations(&self) -> Vec<Termination> {
        self.terminations.lock().unwrap().clone()
    }

    /// Drain recorded requests
    pub fn take(&self) -> Vec<Termination> {
        std::mem::take(&mut *self.terminations.lock().unwrap())
    }

    pub fn set_fail_stop(&self, fail: bool) {
        *self.fail_stop.lock().unwrap() = fail;
    }
}

impl ProcessTerminator for RecordingTerminator {
    fn terminate(
        &self,
        activity: &str,
        processes: &[RunningProcess],
        reason: ViolationReason,
    ) -> HostResult<()> {
        self.terminations.lock().unwrap().push(Termination {
            activity: activity.to_string(),
            processes: processes.to_vec(),
            reason,
        });

        if *self.fail_stop.lock().unwrap() {
            return Err(HostError::StopFailed("Mock stop failure".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn mock_clock_set_and_advance() {
        let start = Local.with_ymd_and_hms(2024, 3, 9, 20, 0, 0).unwrap();
        let clock = MockClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::from_secs(90));
        assert_eq!(dadctl_util::time_of_day(&clock.now()), 2001);

        clock.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn mock_lister_spawn_and_fail() {
        let lister = MockProcessLister::default();
        lister.spawn(1, "C:\\GTA.exe");
        assert_eq!(lister.list_processes().unwrap().len(), 1);

        lister.set_fail_list(true);
        assert!(lister.list_processes().is_err());
    }

    #[test]
    fn recording_terminator_records_even_on_failure() {
        let terminator = RecordingTerminator::new();
        let processes = vec![RunningProcess::new(1, "C:\\GTA.exe")];

        terminator
            .terminate("GTA", &processes, ViolationReason::NotAllowedOnDay)
            .unwrap();
        terminator.set_fail_stop(true);
        assert!(terminator
            .terminate("GTA", &processes, ViolationReason::OutsideTimeRange)
            .is_err());

        let recorded = terminator.take();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].pids(), vec![1]);
        assert_eq!(recorded[1].reason, ViolationReason::OutsideTimeRange);
        assert!(terminator.terminations().is_empty());
    }
}
