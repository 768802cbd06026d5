//! Reload the policy file when it changes on disk

use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};

use crate::{ConfigResult, Policy, load_config};

/// Tracks the modification time of the policy file between scans
#[derive(Debug)]
pub struct ConfigWatcher {
    path: PathBuf,
    last_modified: Option<SystemTime>,
}

impl ConfigWatcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_modified: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the policy unconditionally and remember the file's mtime
    pub fn load(&mut self) -> ConfigResult<Policy> {
        self.last_modified = modified_time(&self.path);
        let policy = load_config(&self.path)?;
        info!(
            path = %self.path.display(),
            rules = policy.rules.len(),
            "Policy loaded"
        );
        Ok(policy)
    }

    /// Reload the policy if the file's mtime advanced past the last one seen.
    ///
    /// Returns `Ok(None)` when nothing changed. The new mtime is recorded
    /// before parsing, so a broken file is reported once rather than on
    /// every call.
    pub fn reload_if_changed(&mut self) -> ConfigResult<Option<Policy>> {
        let modified = match std::fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                if self.last_modified.take().is_some() {
                    return Err(e.into());
                }
                return Ok(None);
            }
        };

        if self.last_modified.is_some_and(|last| modified <= last) {
            return Ok(None);
        }

        debug!(path = %self.path.display(), "Policy file changed");
        self.last_modified = Some(modified);
        load_config(&self.path).map(Some)
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}
