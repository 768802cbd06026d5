//! Raw configuration schema (as parsed from JSON)

use dadctl_util::JsonDuration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw configuration as parsed from JSON
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConfig {
    /// Time between two scans, also the accounting granularity
    #[serde(default)]
    pub sampling_interval: JsonDuration,

    /// Activity rules
    #[serde(default)]
    pub rules: Vec<RawRule>,
}

/// Raw activity rule
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawRule {
    /// Unique activity name
    pub name: String,

    /// Regular expressions matched against executable paths
    #[serde(default)]
    pub programs: Vec<String>,

    /// Weekday ("0" = Sunday, or a day name) -> schedule
    #[serde(default)]
    pub schedules: BTreeMap<String, RawSchedule>,
}

/// Raw schedule for one weekday
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSchedule {
    #[serde(default)]
    pub allowed_periods: Vec<RawTimeWindow>,

    #[serde(default)]
    pub max_duration: JsonDuration,
}

/// Time window, bounds in HHMM encoding
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct RawTimeWindow {
    pub begin: u32,
    pub end: u32,
}
