//! Audit event types

use chrono::{DateTime, Local};
use dadctl_api::ViolationReason;
use serde::{Deserialize, Serialize};

/// Types of audit events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Daemon started
    DaemonStarted,

    /// Daemon stopped
    DaemonStopped,

    /// Policy loaded/reloaded
    PolicyLoaded { rule_count: usize },

    /// Processes of an activity were terminated
    ActivityKilled {
        activity: String,
        reason: ViolationReason,
        pids: Vec<u32>,
    },

    /// A scan landed on a new calendar date; `day` is the weekday index
    /// (Sunday = 0) whose counters were reset
    DayRolledOver { day: u8 },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Row ID, 0 until stored
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Local>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self::at(dadctl_util::now(), event)
    }

    /// Event stamped with a caller-provided time (the engine's clock)
    pub fn at(timestamp: DateTime<Local>, event: AuditEventType) -> Self {
        Self {
            id: 0,
            timestamp,
            event,
        }
    }
}
