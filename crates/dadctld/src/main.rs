//! dadctld - The dad-controller background service
//!
//! This is the main entry point for the dad-controller service.
//! It wires together all the components:
//! - Configuration loading and reloading
//! - Audit store and duration state file
//! - Enforcement engine
//! - Host adapters (Linux)

use anyhow::{Context, Result};
use clap::Parser;
use dadctl_config::ConfigWatcher;
use dadctl_core::{CoreEvent, EnforcementEngine};
use dadctl_host_linux::{SignalTerminator, SysinfoProcessLister, SystemClock};
use dadctl_store::{AuditEvent, AuditEventType, SqliteStore, Store, load_state, save_state};
use dadctl_util::{
    default_audit_db_path, default_config_path, default_state_path, format_duration,
    is_mock_time_active,
};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// dadctld - Per-activity process usage enforcement
#[derive(Parser, Debug)]
#[command(name = "dadctld")]
#[command(about = "Kills processes that run outside their allowed schedule", long_about = None)]
struct Args {
    /// Policy file path
    #[arg(short, long, env = "DADCTL_CONFIG", default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Duration state file path
    #[arg(short, long, env = "DADCTL_STATE", default_value_os_t = default_state_path())]
    state: PathBuf,

    /// Audit database path
    #[arg(short, long, env = "DADCTL_DB", default_value_os_t = default_audit_db_path())]
    db: PathBuf,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Main service state
struct Service {
    engine: EnforcementEngine,
    watcher: ConfigWatcher,
    store: Arc<dyn Store>,
    state_path: PathBuf,
}

impl Service {
    fn new(args: &Args) -> Result<Self> {
        // Load configuration
        let mut watcher = ConfigWatcher::new(&args.config);
        let policy = watcher
            .load()
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        info!(
            config_path = %args.config.display(),
            rule_count = policy.rules.len(),
            sampling_interval = %format_duration(policy.sampling_interval),
            "Configuration loaded"
        );

        // Initialize store
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&args.db)
                .with_context(|| format!("Failed to open database {:?}", args.db))?,
        );

        if !store.is_healthy() {
            anyhow::bail!("Database {:?} is not usable", args.db);
        }

        info!(db_path = %args.db.display(), "Store initialized");

        if let Err(e) = store.append_audit(AuditEvent::new(AuditEventType::DaemonStarted)) {
            warn!(error = %e, "Failed to log service start");
        }

        if is_mock_time_active() {
            warn!("Mock time is active, schedules are evaluated against a shifted clock");
        }

        let mut engine = EnforcementEngine::new(
            policy,
            Arc::new(SystemClock),
            Arc::new(SysinfoProcessLister::new()),
            Arc::new(SignalTerminator::new()),
            store.clone(),
        );

        // Restore counters from the previous run
        match load_state(&args.state) {
            Ok(Some(snapshot)) => engine.restore(&snapshot),
            Ok(None) => info!(
                state_path = %args.state.display(),
                "No saved state, starting fresh"
            ),
            Err(e) => warn!(
                state_path = %args.state.display(),
                error = %e,
                "Failed to load saved state, starting fresh"
            ),
        }

        Ok(Self {
            engine,
            watcher,
            store,
            state_path: args.state.clone(),
        })
    }

    async fn run(mut self) -> Result<()> {
        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;

        info!("Service running");

        self.run_until(async {
            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully"),
                _ = sigint.recv() => info!("Received SIGINT, shutting down gracefully"),
            }
        })
        .await;

        info!("Shutting down dadctld");

        self.save_state();

        if let Err(e) = self
            .store
            .append_audit(AuditEvent::new(AuditEventType::DaemonStopped))
        {
            warn!(error = %e, "Failed to log service shutdown");
        }

        info!("Shutdown complete");
        Ok(())
    }

    /// Sample once per interval until `shutdown` completes. The first scan
    /// happens one interval after startup, so time before the service ran is
    /// never charged.
    async fn run_until(&mut self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);

        loop {
            self.reload_config();

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.engine.sampling_interval()) => {}
            }

            self.scan();
        }
    }

    /// Swap in the policy file if it changed; keep the current one on error
    fn reload_config(&mut self) {
        match self.watcher.reload_if_changed() {
            Ok(Some(policy)) => {
                let event = self.engine.reload_policy(policy);
                Self::handle_core_event(&event);
            }
            Ok(None) => {}
            Err(e) => {
                error!(
                    config_path = %self.watcher.path().display(),
                    error = %e,
                    "Failed to reload config, keeping previous policy"
                );
            }
        }
    }

    fn scan(&mut self) {
        match self.engine.scan() {
            Ok(events) => {
                for event in &events {
                    Self::handle_core_event(event);
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to list processes, scan skipped");
                return;
            }
        }

        self.save_state();
    }

    fn save_state(&self) {
        if let Err(e) = save_state(&self.state_path, &self.engine.snapshot()) {
            warn!(
                state_path = %self.state_path.display(),
                error = %e,
                "Failed to save state"
            );
        }
    }

    fn handle_core_event(event: &CoreEvent) {
        match event {
            CoreEvent::ActivityKilled {
                activity,
                reason,
                pids,
            } => {
                info!(activity = %activity, reason = %reason, pids = ?pids, "Activity killed");
            }
            CoreEvent::DayRolledOver { day } => {
                debug!(day = %day, "Day rolled over");
            }
            CoreEvent::PolicyReloaded { rule_count } => {
                info!(rule_count, "Configuration reloaded");
            }
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "dadctld starting");

    let service = Service::new(&args)?;
    service.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use dadctl_host_api::{MockClock, MockProcessLister, RecordingTerminator};
    use std::path::Path;
    use std::time::Duration;
    use tempfile::tempdir;

    struct Harness {
        service: Service,
        lister: Arc<MockProcessLister>,
        terminator: Arc<RecordingTerminator>,
    }

    fn service(dir: &Path, sampling_interval: &str) -> Harness {
        let config_path = dir.join("dad-controller.json");
        std::fs::write(
            &config_path,
            format!(
                r#"{{"samplingInterval": "{}", "rules": [{{"name": "GTA", "programs": ["GTA.exe"]}}]}}"#,
                sampling_interval
            ),
        )
        .unwrap();

        let mut watcher = ConfigWatcher::new(&config_path);
        let policy = watcher.load().unwrap();

        let lister = Arc::new(MockProcessLister::default());
        let terminator = Arc::new(RecordingTerminator::new());
        let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
        let engine = EnforcementEngine::new(
            policy,
            Arc::new(MockClock::new(
                Local.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap(),
            )),
            lister.clone(),
            terminator.clone(),
            store.clone(),
        );

        Harness {
            service: Service {
                engine,
                watcher,
                store,
                state_path: dir.join("dad-controller.state"),
            },
            lister,
            terminator,
        }
    }

    #[tokio::test]
    async fn test_no_scan_before_first_interval() {
        let dir = tempdir().unwrap();
        let mut harness = service(dir.path(), "1h");
        harness.lister.spawn(1, "C:\\GTA.exe");

        harness
            .service
            .run_until(tokio::time::sleep(Duration::from_millis(50)))
            .await;

        assert_eq!(harness.service.engine.activity_duration("GTA"), Duration::ZERO);
        assert!(harness.terminator.terminations().is_empty());
        assert!(!harness.service.state_path.exists());
    }

    #[tokio::test]
    async fn test_scans_after_each_interval() {
        let dir = tempdir().unwrap();
        let mut harness = service(dir.path(), "20ms");
        harness.lister.spawn(1, "C:\\GTA.exe");

        harness
            .service
            .run_until(tokio::time::sleep(Duration::from_millis(100)))
            .await;

        assert!(harness.service.engine.activity_duration("GTA") >= Duration::from_millis(20));
        assert!(!harness.terminator.terminations().is_empty());
        assert!(harness.service.state_path.exists());
    }
}
