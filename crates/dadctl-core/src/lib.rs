//! Enforcement engine for dad-controller
//!
//! This crate is the heart of dadctld, containing:
//! - Classification of running processes into activities
//! - Per-weekday duration accounting with day rollover
//! - Verdicts (day, duration, time range) and termination requests

mod counters;
mod engine;
mod events;

pub use counters::*;
pub use engine::*;
pub use events::*;
