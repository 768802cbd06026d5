//! Policy configuration for dad-controller
//!
//! Supports JSON configuration with:
//! - Activity rules matching executable paths by regular expression
//! - Per-weekday allowed periods and daily duration limits
//! - Validation with clear error messages
//! - Reloading when the file changes on disk

mod policy;
mod schema;
mod validation;
mod watcher;

pub use policy::*;
pub use schema::*;
pub use validation::*;
pub use watcher::*;

use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Load and validate configuration from a JSON file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<Policy> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from a JSON string
pub fn parse_config(content: &str) -> ConfigResult<Policy> {
    let raw: RawConfig = serde_json::from_str(content)?;

    let errors = validate_config(&raw);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    Ok(Policy::from_raw(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use std::time::Duration;

    #[test]
    fn parse_minimal_config() {
        let config = r#"{
            "samplingInterval": "1m",
            "rules": [{
                "name": "GTA",
                "programs": ["GTA.exe"],
                "schedules": {
                    "6": { "allowedPeriods": [{"begin": 2000, "end": 2100}], "maxDuration": "1h" }
                }
            }]
        }"#;

        let policy = parse_config(config).unwrap();
        assert_eq!(policy.sampling_interval, Duration::from_secs(60));
        assert_eq!(policy.rules.len(), 1);

        let gta = policy.get_rule("GTA").unwrap();
        assert_eq!(gta.patterns()[0].as_str(), "GTA.exe");

        let saturday = gta.schedule_for(Weekday::Sat).unwrap();
        assert_eq!(saturday.max_duration, Duration::from_secs(3600));
        assert!(saturday.allows_time(2030));
        assert!(gta.schedule_for(Weekday::Sun).is_none());
    }

    #[test]
    fn reject_malformed_json() {
        let result = parse_config(r#"{"rules": [ "#);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn reject_invalid_pattern() {
        let config = r#"{
            "samplingInterval": "1m",
            "rules": [{ "name": "GTA", "programs": ["(GTA"] }]
        }"#;

        let result = parse_config(config);
        assert!(matches!(result, Err(ConfigError::ValidationFailed { .. })));
    }

    #[test]
    fn reject_weekday_given_twice() {
        let config = r#"{
            "samplingInterval": "1m",
            "rules": [{
                "name": "GTA",
                "schedules": {
                    "6": { "allowedPeriods": [{"begin": 2000, "end": 2100}], "maxDuration": "1h" },
                    "sat": { "allowedPeriods": [{"begin": 800, "end": 900}], "maxDuration": "5m" }
                }
            }]
        }"#;

        let result = parse_config(config);
        assert!(matches!(result, Err(ConfigError::ValidationFailed { errors }) if errors.len() == 1));
    }

    #[test]
    fn missing_file_is_read_error() {
        let result = load_config("/nonexistent/dad-controller.json");
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }
}
