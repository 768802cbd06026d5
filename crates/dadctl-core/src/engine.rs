//! Enforcement engine

use chrono::{DateTime, Datelike, Local, Weekday};
use dadctl_api::{RunningProcess, Verdict, ViolationReason};
use dadctl_config::Policy;
use dadctl_host_api::{Clock, HostResult, ProcessLister, ProcessTerminator};
use dadctl_store::{AuditEvent, AuditEventType, StateSnapshot, Store};
use dadctl_util::{
    format_datetime_full, format_duration, same_calendar_date, time_of_day, weekday_index,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{CoreEvent, DurationCounters};

/// Running processes grouped by the activity whose patterns matched them
pub type ClassifiedActivities = BTreeMap<String, Vec<RunningProcess>>;

/// The enforcement engine
///
/// Owns the policy and the duration counters. Each [`scan`](Self::scan)
/// classifies the running processes, accounts one sampling interval to every
/// observed activity and terminates the activities that violate their
/// schedule.
pub struct EnforcementEngine {
    policy: Policy,
    counters: DurationCounters,
    last_control_time: DateTime<Local>,
    clock: Arc<dyn Clock>,
    processes: Arc<dyn ProcessLister>,
    terminator: Arc<dyn ProcessTerminator>,
    store: Arc<dyn Store>,
}

impl EnforcementEngine {
    /// Create a new engine; the last control time starts at the clock's now
    pub fn new(
        policy: Policy,
        clock: Arc<dyn Clock>,
        processes: Arc<dyn ProcessLister>,
        terminator: Arc<dyn ProcessTerminator>,
        store: Arc<dyn Store>,
    ) -> Self {
        let last_control_time = clock.now();

        info!(
            rule_count = policy.rules.len(),
            sampling_interval = %format_duration(policy.sampling_interval),
            "Enforcement engine initialized"
        );

        let _ = store.append_audit(AuditEvent::at(
            last_control_time,
            AuditEventType::PolicyLoaded {
                rule_count: policy.rules.len(),
            },
        ));

        Self {
            policy,
            counters: DurationCounters::new(),
            last_control_time,
            clock,
            processes,
            terminator,
            store,
        }
    }

    /// Get current policy
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn sampling_interval(&self) -> Duration {
        self.policy.sampling_interval
    }

    pub fn last_control_time(&self) -> DateTime<Local> {
        self.last_control_time
    }

    pub fn counters(&self) -> &DurationCounters {
        &self.counters
    }

    /// Replace rules and sampling interval; counters are kept
    pub fn reload_policy(&mut self, policy: Policy) -> CoreEvent {
        let rule_count = policy.rules.len();
        self.policy = policy;

        let _ = self.store.append_audit(AuditEvent::at(
            self.clock.now(),
            AuditEventType::PolicyLoaded { rule_count },
        ));

        info!(rule_count, "Policy reloaded");

        CoreEvent::PolicyReloaded { rule_count }
    }

    fn current_day(&self) -> Weekday {
        self.last_control_time.weekday()
    }

    /// Accumulated duration of `activity` for the current weekday
    pub fn activity_duration(&self, activity: &str) -> Duration {
        self.counters.get(self.current_day(), activity)
    }

    /// Seed the accumulated duration of `activity` for the current weekday
    pub fn set_activity_duration(&mut self, activity: &str, duration: Duration) {
        let day = self.current_day();
        self.counters.set(day, activity, duration);
    }

    /// Run one scan: list, classify, account, enforce.
    ///
    /// If the process list cannot be obtained nothing else happens and the
    /// error is returned; the counters and last control time are untouched.
    pub fn scan(&mut self) -> HostResult<Vec<CoreEvent>> {
        let processes = self.processes.list_processes()?;
        let classified = self.classify(&processes);
        let now = self.clock.now();

        let mut events = Vec::new();
        events.extend(self.update_counters(&classified, now));

        for (activity, verdict) in self.control_activities(&classified) {
            let Some(reason) = verdict.reason() else {
                continue;
            };
            let pids = classified
                .get(&activity)
                .map(|list| list.iter().map(|p| p.pid).collect())
                .unwrap_or_default();
            events.push(CoreEvent::ActivityKilled {
                activity,
                reason,
                pids,
            });
        }

        self.dump_state();
        Ok(events)
    }

    /// Group running processes by activity.
    ///
    /// A process lands in every activity one of whose patterns matches its
    /// path, once per matching pattern. Activities without a match are
    /// absent.
    pub fn classify(&self, processes: &[RunningProcess]) -> ClassifiedActivities {
        let mut classified = ClassifiedActivities::new();

        for rule in &self.policy.rules {
            for pattern in rule.patterns() {
                for process in processes {
                    if pattern.is_match(&process.path) {
                        classified
                            .entry(rule.name.clone())
                            .or_default()
                            .push(process.clone());
                    }
                }
            }
        }

        classified
    }

    /// Account one sampling interval to every observed activity.
    ///
    /// When `now` falls on another calendar date than the previous scan, the
    /// bucket of `now`'s weekday is discarded first.
    pub fn update_counters(
        &mut self,
        classified: &ClassifiedActivities,
        now: DateTime<Local>,
    ) -> Option<CoreEvent> {
        let mut rollover = None;

        if !same_calendar_date(&now, &self.last_control_time) {
            let day = now.weekday();
            self.counters.reset_day(day);

            let _ = self.store.append_audit(AuditEvent::at(
                now,
                AuditEventType::DayRolledOver {
                    day: weekday_index(day),
                },
            ));
            info!(day = %day, "New day, counters reset");

            rollover = Some(CoreEvent::DayRolledOver { day });
        }

        self.last_control_time = now;

        let day = self.current_day();
        let interval = self.policy.sampling_interval;
        for activity in classified.keys() {
            self.counters.add(day, activity, interval);
        }

        rollover
    }

    /// Decide on every observed activity and terminate the violating ones.
    ///
    /// Uses the weekday and time of day of the last control time.
    pub fn control_activities(
        &self,
        classified: &ClassifiedActivities,
    ) -> Vec<(String, Verdict)> {
        let mut verdicts = Vec::with_capacity(classified.len());

        for (activity, processes) in classified {
            let verdict = self.evaluate(activity);

            match verdict.reason() {
                Some(reason) => self.kill(activity, processes, reason),
                None => debug!(activity = %activity, "Activity allowed"),
            }

            verdicts.push((activity.clone(), verdict));
        }

        verdicts
    }

    /// Verdict for `activity` at the last control time, without side effects
    pub fn evaluate(&self, activity: &str) -> Verdict {
        let day = self.current_day();

        let Some(schedule) = self.policy.resolve(activity).schedule_for(day) else {
            return Verdict::Kill(ViolationReason::NotAllowedOnDay);
        };

        if schedule.exceeds_max_duration(self.counters.get(day, activity)) {
            return Verdict::Kill(ViolationReason::DurationAboveThreshold);
        }

        if !schedule.allows_time(time_of_day(&self.last_control_time)) {
            return Verdict::Kill(ViolationReason::OutsideTimeRange);
        }

        Verdict::Allowed
    }

    fn kill(&self, activity: &str, processes: &[RunningProcess], reason: ViolationReason) {
        let pids: Vec<u32> = processes.iter().map(|p| p.pid).collect();

        info!(
            activity = %activity,
            reason = %reason,
            pids = ?pids,
            "Terminating activity"
        );

        if let Err(e) = self.terminator.terminate(activity, processes, reason) {
            warn!(activity = %activity, error = %e, "Failed to terminate activity");
        }

        let _ = self.store.append_audit(AuditEvent::at(
            self.last_control_time,
            AuditEventType::ActivityKilled {
                activity: activity.to_string(),
                reason,
                pids,
            },
        ));
    }

    /// Counters and last control time, for the state file
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            last_control_time: self.last_control_time,
            activity_duration: self.counters.to_snapshot(),
        }
    }

    /// Replace counters and last control time with a saved state
    pub fn restore(&mut self, snapshot: &StateSnapshot) {
        self.last_control_time = snapshot.last_control_time;
        self.counters = DurationCounters::from_snapshot(&snapshot.activity_duration);

        info!(
            last_control_time = %format_datetime_full(&snapshot.last_control_time),
            "State restored"
        );
    }

    /// Log the counters of the current weekday
    pub fn dump_state(&self) {
        let day = self.current_day();
        match self.counters.bucket(day) {
            Some(bucket) => {
                let mut entries: Vec<_> = bucket.iter().collect();
                entries.sort();
                for (activity, duration) in entries {
                    debug!(
                        day = %day,
                        activity = %activity,
                        duration = %format_duration(*duration),
                        "Activity duration"
                    );
                }
            }
            None => debug!(day = %day, "No activity recorded today"),
        }
    }
}
