//! Validated policy structures

use chrono::Weekday;
use dadctl_util::{parse_weekday, validate_time_of_day};
use regex::Regex;
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

use crate::schema::{RawConfig, RawRule, RawSchedule};

/// Validated policy ready for use by the enforcement engine
#[derive(Debug, Clone, Default)]
pub struct Policy {
    /// Time between two scans; each scan that observes an activity adds
    /// exactly this much to its counter
    pub sampling_interval: Duration,

    /// Activity rules, names unique
    pub rules: Vec<ActivityRule>,
}

impl Policy {
    pub fn new(sampling_interval: Duration) -> Self {
        Self {
            sampling_interval,
            rules: Vec::new(),
        }
    }

    /// Convert from raw config (after validation)
    pub(crate) fn from_raw(raw: RawConfig) -> Self {
        let mut policy = Policy::new(raw.sampling_interval.0);
        for rule in raw.rules {
            policy.rules.push(ActivityRule::from_raw(rule));
        }
        policy
    }

    /// Get rule by exact name
    pub fn get_rule(&self, name: &str) -> Option<&ActivityRule> {
        self.rules.iter().find(|r| r.name == name)
    }

    /// Get rule by exact name, appending an empty one if missing
    pub fn get_or_create_rule(&mut self, name: &str) -> &mut ActivityRule {
        let index = match self.rules.iter().position(|r| r.name == name) {
            Some(index) => index,
            None => {
                self.rules.push(ActivityRule::new(name));
                self.rules.len() - 1
            }
        };
        &mut self.rules[index]
    }

    /// Look up the rule for an activity without touching the model
    pub fn resolve(&self, name: &str) -> RuleLookup<'_> {
        match self.get_rule(name) {
            Some(rule) => RuleLookup::Known(rule),
            None => RuleLookup::Unknown,
        }
    }
}

/// Result of looking up an activity in the policy
#[derive(Debug, Clone, Copy)]
pub enum RuleLookup<'a> {
    Known(&'a ActivityRule),
    /// No rule carries this name; it has no schedule on any day
    Unknown,
}

impl<'a> RuleLookup<'a> {
    pub fn schedule_for(&self, day: Weekday) -> Option<&'a DaySchedule> {
        match self {
            RuleLookup::Known(rule) => rule.schedule_for(day),
            RuleLookup::Unknown => None,
        }
    }
}

/// A named activity: which executables belong to it and when it may run
#[derive(Debug, Clone)]
pub struct ActivityRule {
    pub name: String,
    patterns: Vec<ProcessPattern>,
    schedules: HashMap<Weekday, DaySchedule>,
}

impl ActivityRule {
    /// Create a rule with no patterns and no schedules (never allowed)
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            patterns: Vec::new(),
            schedules: HashMap::new(),
        }
    }

    fn from_raw(raw: RawRule) -> Self {
        let mut rule = ActivityRule::new(raw.name);

        for program in &raw.programs {
            if let Err(e) = rule.add_process_pattern(program) {
                warn!(rule = %rule.name, pattern = %program, error = %e, "Skipping invalid program pattern");
            }
        }

        for (key, schedule) in raw.schedules {
            match parse_weekday(&key) {
                Ok(day) => rule.apply_raw_schedule(day, schedule),
                Err(e) => warn!(rule = %rule.name, error = %e, "Skipping schedule"),
            }
        }

        rule
    }

    fn apply_raw_schedule(&mut self, day: Weekday, raw: RawSchedule) {
        let days = [day];
        self.set_max_duration_per_day(&days, raw.max_duration.0);
        for window in raw.allowed_periods {
            let (begin, end) =
                match (validate_time_of_day(window.begin), validate_time_of_day(window.end)) {
                    (Ok(begin), Ok(end)) => (begin, end),
                    (Err(e), _) | (_, Err(e)) => {
                        warn!(rule = %self.name, day = %day, error = %e, "Skipping allowed period");
                        continue;
                    }
                };

            if end <= begin {
                warn!(
                    rule = %self.name,
                    day = %day,
                    begin = window.begin,
                    end = window.end,
                    "Allowed period can never match (end is not after begin)"
                );
            }
            self.add_allowed_period(&days, begin, end);
        }
    }

    /// Compile and append a process pattern.
    ///
    /// A pattern that does not compile is not added and the error is
    /// returned to the caller.
    pub fn add_process_pattern(&mut self, pattern: &str) -> Result<(), regex::Error> {
        self.patterns.push(ProcessPattern::new(pattern)?);
        Ok(())
    }

    pub fn patterns(&self) -> &[ProcessPattern] {
        &self.patterns
    }

    /// Append a `[begin, end)` window (HHMM) to the schedule of every day in
    /// `days`, creating schedules as needed
    pub fn add_allowed_period(&mut self, days: &[Weekday], begin: u16, end: u16) {
        for day in days {
            self.schedules
                .entry(*day)
                .or_default()
                .allowed_periods
                .push(TimeWindow::new(begin, end));
        }
    }

    /// Set (overwrite) the maximum cumulative duration for every day in
    /// `days`, creating schedules as needed
    pub fn set_max_duration_per_day(&mut self, days: &[Weekday], max_duration: Duration) {
        for day in days {
            self.schedules.entry(*day).or_default().max_duration = max_duration;
        }
    }

    pub fn schedule_for(&self, day: Weekday) -> Option<&DaySchedule> {
        self.schedules.get(&day)
    }

    /// Number of weekdays with a schedule
    pub fn scheduled_day_count(&self) -> usize {
        self.schedules.len()
    }
}

/// A compiled process-path regular expression
#[derive(Debug, Clone)]
pub struct ProcessPattern {
    regex: Regex,
}

impl ProcessPattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

/// What is allowed on one weekday
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DaySchedule {
    /// Union of allowed windows
    pub allowed_periods: Vec<TimeWindow>,
    /// Maximum cumulative duration for the day
    pub max_duration: Duration,
}

impl DaySchedule {
    /// True if `time_of_day` (HHMM) falls inside any allowed window
    pub fn allows_time(&self, time_of_day: u16) -> bool {
        self.allowed_periods.iter().any(|w| w.contains(time_of_day))
    }

    /// True if `accumulated` is strictly above the day's maximum
    pub fn exceeds_max_duration(&self, accumulated: Duration) -> bool {
        accumulated > self.max_duration
    }
}

/// Half-open `[begin, end)` time-of-day window in HHMM encoding.
/// Windows do not wrap around midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub begin: u16,
    pub end: u16,
}

impl TimeWindow {
    pub fn new(begin: u16, end: u16) -> Self {
        Self { begin, end }
    }

    pub fn contains(&self, time_of_day: u16) -> bool {
        self.begin <= time_of_day && time_of_day < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dadctl_util::ALL_WEEKDAYS;

    #[test]
    fn test_get_or_create_rule() {
        let mut policy = Policy::new(Duration::from_secs(60));

        policy.get_or_create_rule("GTA").add_process_pattern("GTA.exe").unwrap();
        policy.get_or_create_rule("Minecraft");
        policy.get_or_create_rule("GTA").add_process_pattern("GTA5.exe").unwrap();

        assert_eq!(policy.rules.len(), 2);
        assert_eq!(policy.get_rule("GTA").unwrap().patterns().len(), 2);
        assert!(policy.get_rule("gta").is_none());
    }

    #[test]
    fn test_resolve_does_not_create() {
        let policy = Policy::new(Duration::from_secs(60));

        assert!(matches!(policy.resolve("Unknown"), RuleLookup::Unknown));
        assert!(policy.resolve("Unknown").schedule_for(Weekday::Mon).is_none());
        assert!(policy.rules.is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let mut rule = ActivityRule::new("broken");
        assert!(rule.add_process_pattern("[unclosed").is_err());
        assert!(rule.patterns().is_empty());
    }

    #[test]
    fn test_add_allowed_period_per_day() {
        let mut rule = ActivityRule::new("GTA");
        rule.add_allowed_period(&[Weekday::Sat, Weekday::Sun], 1000, 1200);
        rule.add_allowed_period(&[Weekday::Sat], 2000, 2100);

        let saturday = rule.schedule_for(Weekday::Sat).unwrap();
        assert_eq!(saturday.allowed_periods.len(), 2);
        assert_eq!(rule.schedule_for(Weekday::Sun).unwrap().allowed_periods.len(), 1);
        assert!(rule.schedule_for(Weekday::Mon).is_none());
        assert_eq!(rule.scheduled_day_count(), 2);
    }

    #[test]
    fn test_set_max_duration_overwrites() {
        let mut rule = ActivityRule::new("GTA");
        rule.set_max_duration_per_day(&ALL_WEEKDAYS, Duration::from_secs(900));
        rule.set_max_duration_per_day(&[Weekday::Wed], Duration::from_secs(300));

        assert_eq!(
            rule.schedule_for(Weekday::Wed).unwrap().max_duration,
            Duration::from_secs(300)
        );
        assert_eq!(
            rule.schedule_for(Weekday::Thu).unwrap().max_duration,
            Duration::from_secs(900)
        );
        assert!(rule.schedule_for(Weekday::Wed).unwrap().allowed_periods.is_empty());
    }

    #[test]
    fn test_time_window_is_half_open() {
        let window = TimeWindow::new(2000, 2100);

        assert!(!window.contains(1800));
        assert!(!window.contains(1959));
        assert!(window.contains(2000));
        assert!(window.contains(2059));
        assert!(!window.contains(2100));
    }

    #[test]
    fn test_inverted_window_never_matches() {
        let window = TimeWindow::new(2200, 200);
        for t in [0, 100, 159, 200, 1200, 2200, 2359] {
            assert!(!window.contains(t));
        }
    }

    #[test]
    fn test_day_schedule_union_and_threshold() {
        let schedule = DaySchedule {
            allowed_periods: vec![TimeWindow::new(800, 900), TimeWindow::new(1700, 1900)],
            max_duration: Duration::from_secs(15 * 60),
        };

        assert!(schedule.allows_time(830));
        assert!(schedule.allows_time(1800));
        assert!(!schedule.allows_time(1200));

        assert!(!schedule.exceeds_max_duration(Duration::from_secs(15 * 60)));
        assert!(schedule.exceeds_max_duration(Duration::from_secs(16 * 60)));
    }

    #[test]
    fn test_unvalidated_out_of_range_window_is_skipped() {
        use crate::schema::RawTimeWindow;
        use dadctl_util::JsonDuration;
        use std::collections::BTreeMap;

        let raw = RawConfig {
            sampling_interval: JsonDuration(Duration::from_secs(60)),
            rules: vec![RawRule {
                name: "GTA".into(),
                programs: vec!["GTA.exe".into()],
                schedules: BTreeMap::from([(
                    "sat".to_string(),
                    RawSchedule {
                        allowed_periods: vec![
                            RawTimeWindow { begin: 2000, end: 2100 },
                            RawTimeWindow { begin: 67_536, end: 67_636 },
                            RawTimeWindow { begin: 1000, end: 2500 },
                        ],
                        max_duration: JsonDuration(Duration::from_secs(900)),
                    },
                )]),
            }],
        };

        let policy = Policy::from_raw(raw);
        let saturday = policy.get_rule("GTA").unwrap().schedule_for(Weekday::Sat).unwrap();

        assert_eq!(saturday.allowed_periods, vec![TimeWindow::new(2000, 2100)]);
        assert_eq!(saturday.max_duration, Duration::from_secs(900));
    }

    #[test]
    fn test_pattern_matches_anywhere_in_path() {
        let pattern = ProcessPattern::new("GTA.exe").unwrap();
        assert!(pattern.is_match("C:\\Games\\GTA.exe"));
        assert!(!pattern.is_match("C:\\Games\\Minecraft.exe"));
        assert_eq!(pattern.as_str(), "GTA.exe");
    }
}
