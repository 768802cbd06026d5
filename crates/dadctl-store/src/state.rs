//! Duration state file
//!
//! The engine's counters and last scan time, written after every scan and
//! read back once at startup so a restart does not forget today's usage.

use chrono::{DateTime, Local};
use dadctl_util::JsonDuration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use tracing::debug;

use crate::StoreResult;

/// Persisted engine state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    /// Time of the most recent scan
    pub last_control_time: DateTime<Local>,

    /// Weekday index (Sunday = 0) -> activity name -> accumulated duration
    #[serde(default)]
    pub activity_duration: BTreeMap<u8, BTreeMap<String, JsonDuration>>,
}

/// Load the state file.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_state(path: impl AsRef<Path>) -> StoreResult<Option<StateSnapshot>> {
    let path = path.as_ref();
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let snapshot: StateSnapshot = serde_json::from_str(&content)?;
    debug!(path = %path.display(), "State loaded");
    Ok(Some(snapshot))
}

/// Write the state file, replacing the previous one
pub fn save_state(path: impl AsRef<Path>, snapshot: &StateSnapshot) -> StoreResult<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(snapshot)?;

    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;

    debug!(path = %path.display(), "State saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;
    use chrono::TimeZone;
    use std::time::Duration;
    use tempfile::tempdir;

    fn sample() -> StateSnapshot {
        StateSnapshot {
            last_control_time: Local.with_ymd_and_hms(2024, 3, 9, 20, 30, 0).unwrap(),
            activity_duration: BTreeMap::from([(
                6,
                BTreeMap::from([
                    ("GTA".to_string(), JsonDuration(Duration::from_secs(14 * 60))),
                    ("Minecraft".to_string(), JsonDuration(Duration::from_secs(60))),
                ]),
            )]),
        }
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempdir().unwrap();
        assert!(load_state(dir.path().join("dad-controller.state")).unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dad-controller.state");

        save_state(&path, &sample()).unwrap();
        assert!(!path.with_extension("tmp").exists());

        let loaded = load_state(&path).unwrap().unwrap();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_file_format() {
        let json = serde_json::to_value(sample()).unwrap();

        assert!(json.get("lastControlTime").is_some());
        assert_eq!(json["activityDuration"]["6"]["GTA"], "14m0s");
    }

    #[test]
    fn test_reads_nanosecond_durations() {
        let json = r#"{
            "lastControlTime": "2024-03-09T20:30:00+01:00",
            "activityDuration": { "6": { "GTA": 840000000000 } }
        }"#;

        let snapshot: StateSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(
            snapshot.activity_duration[&6]["GTA"].0,
            Duration::from_secs(14 * 60)
        );
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dad-controller.state");
        std::fs::write(&path, "{ truncated").unwrap();

        assert!(matches!(load_state(&path), Err(StoreError::Serialization(_))));
    }
}
