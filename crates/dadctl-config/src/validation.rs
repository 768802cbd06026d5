//! Configuration validation

use dadctl_util::{parse_weekday, validate_time_of_day};
use regex::Regex;
use std::collections::HashSet;
use thiserror::Error;

use crate::schema::{RawConfig, RawRule, RawTimeWindow};

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Rule '{rule}': {message}")]
    RuleError { rule: String, message: String },

    #[error("Duplicate rule name: {0}")]
    DuplicateRuleName(String),

    #[error("Rule '{rule}': invalid program pattern '{pattern}': {message}")]
    InvalidPattern {
        rule: String,
        pattern: String,
        message: String,
    },

    #[error("Global config error: {0}")]
    GlobalError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.sampling_interval.0.is_zero() {
        errors.push(ValidationError::GlobalError(
            "samplingInterval must be greater than zero".into(),
        ));
    }

    // Check for duplicate rule names
    let mut seen_names = HashSet::new();
    for rule in &config.rules {
        if !seen_names.insert(&rule.name) {
            errors.push(ValidationError::DuplicateRuleName(rule.name.clone()));
        }
    }

    for rule in &config.rules {
        errors.extend(validate_rule(rule));
    }

    errors
}

fn validate_rule(rule: &RawRule) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if rule.name.is_empty() {
        errors.push(ValidationError::RuleError {
            rule: rule.name.clone(),
            message: "name cannot be empty".into(),
        });
    }

    for pattern in &rule.programs {
        if let Err(e) = Regex::new(pattern) {
            errors.push(ValidationError::InvalidPattern {
                rule: rule.name.clone(),
                pattern: pattern.clone(),
                message: e.to_string(),
            });
        }
    }

    let mut seen_days = HashSet::new();
    for (day, schedule) in &rule.schedules {
        match parse_weekday(day) {
            Ok(weekday) if !seen_days.insert(weekday) => {
                errors.push(ValidationError::RuleError {
                    rule: rule.name.clone(),
                    message: format!("duplicate schedule for {}", weekday),
                });
            }
            Ok(_) => {}
            Err(e) => errors.push(ValidationError::RuleError {
                rule: rule.name.clone(),
                message: e.to_string(),
            }),
        }

        for window in &schedule.allowed_periods {
            errors.extend(validate_time_window(window, &rule.name));
        }
    }

    errors
}

fn validate_time_window(window: &RawTimeWindow, rule: &str) -> Vec<ValidationError> {
    [window.begin, window.end]
        .into_iter()
        .filter_map(|bound| validate_time_of_day(bound).err())
        .map(|e| ValidationError::RuleError {
            rule: rule.to_string(),
            message: e.to_string(),
        })
        .collect()
}
