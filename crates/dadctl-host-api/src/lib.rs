//! Host collaborator interfaces for dad-controller
//!
//! This crate defines the seams between the enforcement engine and the
//! operating system: where the time comes from, how running processes are
//! enumerated and how they are stopped. It contains no platform code itself;
//! deterministic mocks are provided for tests.

mod mock;
mod traits;

pub use mock::*;
pub use traits::*;
