//! Default paths for dad-controller files
//!
//! All files live in the working directory of the daemon unless overridden
//! on the command line:
//! - Configuration: `dad-controller.json`
//! - Persisted counters: `dad-controller.state`
//! - Audit log: `dad-controller.db`

use std::path::PathBuf;

/// Configuration file name
pub const CONFIG_FILENAME: &str = "dad-controller.json";

/// State snapshot file name
pub const STATE_FILENAME: &str = "dad-controller.state";

/// Audit database file name
pub const AUDIT_DB_FILENAME: &str = "dad-controller.db";

/// Default configuration path, relative to the working directory
pub fn default_config_path() -> PathBuf {
    PathBuf::from(CONFIG_FILENAME)
}

/// Default state snapshot path, relative to the working directory
pub fn default_state_path() -> PathBuf {
    PathBuf::from(STATE_FILENAME)
}

/// Default audit database path, relative to the working directory
pub fn default_audit_db_path() -> PathBuf {
    PathBuf::from(AUDIT_DB_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_are_relative_to_working_dir() {
        for path in [
            default_config_path(),
            default_state_path(),
            default_audit_db_path(),
        ] {
            assert!(path.is_relative());
            assert!(path.to_string_lossy().starts_with("dad-controller."));
        }
    }
}
