//! Shared utilities for dad-controller
//!
//! This crate provides:
//! - Time utilities (mockable wall clock, HHMM time-of-day, weekday indexing)
//! - Duration parsing/formatting and the JSON duration codec
//! - Error types
//! - Default paths for the configuration, state and audit files

mod duration;
mod error;
mod paths;
mod time;

pub use duration::*;
pub use error::*;
pub use paths::*;
pub use time::*;
