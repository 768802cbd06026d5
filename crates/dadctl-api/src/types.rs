//! Shared types for dad-controller

use serde::{Deserialize, Serialize};
use std::fmt;

/// A process observed on the host
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunningProcess {
    /// OS process identifier
    #[serde(alias = "Id")]
    pub pid: u32,

    /// Full filesystem path of the executable
    #[serde(alias = "Path")]
    pub path: String,
}

impl RunningProcess {
    pub fn new(pid: u32, path: impl Into<String>) -> Self {
        Self {
            pid,
            path: path.into(),
        }
    }
}

/// Why an observed activity must be stopped
///
/// Variants are listed in evaluation order; only the first violation found
/// is ever reported for an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationReason {
    /// No schedule exists for the current weekday
    NotAllowedOnDay,
    /// Accumulated duration is above the day's maximum
    DurationAboveThreshold,
    /// Current time of day is outside every allowed window
    OutsideTimeRange,
}

impl ViolationReason {
    /// Human-readable reason handed to the termination collaborator
    pub fn message(&self) -> &'static str {
        match self {
            ViolationReason::NotAllowedOnDay => "activity not allowed on this day",
            ViolationReason::DurationAboveThreshold => {
                "activity duration above threshold for this day"
            }
            ViolationReason::OutsideTimeRange => "activity not allowed during this time range",
        }
    }
}

impl fmt::Display for ViolationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Outcome of evaluating one observed activity during a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum Verdict {
    Allowed,
    Kill(ViolationReason),
}

impl Verdict {
    pub fn reason(&self) -> Option<ViolationReason> {
        match self {
            Verdict::Allowed => None,
            Verdict::Kill(reason) => Some(*reason),
        }
    }
}
