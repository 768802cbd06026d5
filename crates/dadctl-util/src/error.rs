//! Error types for dad-controller

use thiserror::Error;

/// Error type for the value parsers shared across crates
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("Invalid duration '{value}': {message}")]
    InvalidDuration { value: String, message: String },

    #[error("Invalid weekday: {0}")]
    InvalidWeekday(String),

    #[error("Invalid time of day {0}: expected HHMM between 0000 and 2359")]
    InvalidTimeOfDay(u32),
}

impl ControllerError {
    pub fn duration(value: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDuration {
            value: value.into(),
            message: message.into(),
        }
    }

    pub fn weekday(value: impl Into<String>) -> Self {
        Self::InvalidWeekday(value.into())
    }
}

pub type Result<T> = std::result::Result<T, ControllerError>;
