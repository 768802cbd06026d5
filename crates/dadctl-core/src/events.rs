//! Core events emitted by the engine

use chrono::Weekday;
use dadctl_api::ViolationReason;

/// Events emitted by the enforcement engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    /// Termination was requested for every process of an activity
    ActivityKilled {
        activity: String,
        reason: ViolationReason,
        pids: Vec<u32>,
    },

    /// A scan landed on a new calendar date and the counters of `day`
    /// were reset
    DayRolledOver { day: Weekday },

    /// Policy was reloaded
    PolicyReloaded { rule_count: usize },
}
