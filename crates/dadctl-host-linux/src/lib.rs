//! Linux host adapters for dadctld
//!
//! Provides:
//! - Wall clock honouring the mock-time override of debug builds
//! - Process enumeration with resolved executable paths
//! - Forceful (SIGKILL) termination of violating processes

mod clock;
mod process;

pub use clock::*;
pub use process::*;
