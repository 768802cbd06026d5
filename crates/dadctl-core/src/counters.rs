//! Per-weekday duration counters

use chrono::Weekday;
use dadctl_util::{JsonDuration, weekday_from_index, weekday_index};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::warn;

/// Accumulated duration per weekday and activity.
///
/// Only the bucket of the current weekday is consulted by the engine; the
/// others are kept until a date change lands on their weekday again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DurationCounters {
    buckets: HashMap<Weekday, HashMap<String, Duration>>,
}

impl DurationCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulated duration, zero if never observed
    pub fn get(&self, day: Weekday, activity: &str) -> Duration {
        self.buckets
            .get(&day)
            .and_then(|bucket| bucket.get(activity))
            .copied()
            .unwrap_or_default()
    }

    pub fn set(&mut self, day: Weekday, activity: &str, duration: Duration) {
        self.buckets
            .entry(day)
            .or_default()
            .insert(activity.to_string(), duration);
    }

    pub fn add(&mut self, day: Weekday, activity: &str, duration: Duration) {
        *self
            .buckets
            .entry(day)
            .or_default()
            .entry(activity.to_string())
            .or_default() += duration;
    }

    /// Discard the bucket of `day`; returns whether one existed
    pub fn reset_day(&mut self, day: Weekday) -> bool {
        self.buckets.remove(&day).is_some()
    }

    pub fn bucket(&self, day: Weekday) -> Option<&HashMap<String, Duration>> {
        self.buckets.get(&day)
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Convert to the state-file layout (weekday index, Sunday = 0)
    pub fn to_snapshot(&self) -> BTreeMap<u8, BTreeMap<String, JsonDuration>> {
        self.buckets
            .iter()
            .map(|(day, bucket)| {
                let bucket: BTreeMap<String, JsonDuration> = bucket
                    .iter()
                    .map(|(name, d)| (name.clone(), JsonDuration(*d)))
                    .collect();
                (weekday_index(*day), bucket)
            })
            .collect()
    }

    /// Rebuild from the state-file layout, skipping unknown weekday indices
    pub fn from_snapshot(snapshot: &BTreeMap<u8, BTreeMap<String, JsonDuration>>) -> Self {
        let mut counters = Self::new();
        for (index, bucket) in snapshot {
            let Some(day) = weekday_from_index(*index) else {
                warn!(index, "Ignoring counters for unknown weekday index");
                continue;
            };
            let restored = counters.buckets.entry(day).or_default();
            for (name, d) in bucket {
                restored.insert(name.clone(), d.0);
            }
        }
        counters
    }
}
