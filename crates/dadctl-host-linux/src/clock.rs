//! System clock

use chrono::{DateTime, Local};
use dadctl_host_api::Clock;

/// Local wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        dadctl_util::now()
    }
}
