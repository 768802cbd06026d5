//! Shared value types for dad-controller
//!
//! Types that cross crate boundaries: the processes reported by the host,
//! the verdicts reached by the engine and the reasons for a kill.

mod types;

pub use types::*;
