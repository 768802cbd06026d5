//! SQLite-based audit store

use chrono::{DateTime, Local};
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::{AuditEvent, AuditEventType, Store, StoreError, StoreResult};

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("store lock poisoned".into()))
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            -- Audit log (append-only)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

impl Store for SqliteStore {
    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let conn = self.lock()?;
        let event_json = serde_json::to_string(&event.event)?;

        conn.execute(
            "INSERT INTO audit_log (timestamp, event_json) VALUES (?, ?)",
            params![event.timestamp.to_rfc3339(), event_json],
        )?;

        event.id = conn.last_insert_rowid();
        debug!(event_id = event.id, "Audit event appended");

        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_json FROM audit_log ORDER BY id DESC LIMIT ?",
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let id: i64 = row.get(0)?;
            let timestamp_str: String = row.get(1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp_str, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp_str, event_json) = row?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map(|dt| dt.with_timezone(&Local))
                .unwrap_or_else(|_| dadctl_util::now());
            let event: AuditEventType = serde_json::from_str(&event_json)?;

            events.push(AuditEvent {
                id,
                timestamp,
                event,
            });
        }

        Ok(events)
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use dadctl_api::ViolationReason;
    use tempfile::tempdir;

    #[test]
    fn test_in_memory_store() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.is_healthy());
    }

    #[test]
    fn test_audit_log_newest_first() {
        let store = SqliteStore::in_memory().unwrap();

        store
            .append_audit(AuditEvent::new(AuditEventType::DaemonStarted))
            .unwrap();
        store
            .append_audit(AuditEvent::new(AuditEventType::PolicyLoaded { rule_count: 3 }))
            .unwrap();

        let events = store.get_recent_audits(10).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event, AuditEventType::PolicyLoaded { rule_count: 3 });
        assert_eq!(events[1].event, AuditEventType::DaemonStarted);
        assert!(events[0].id > events[1].id);

        assert_eq!(store.get_recent_audits(1).unwrap().len(), 1);
    }

    #[test]
    fn test_kill_event_round_trip() {
        let store = SqliteStore::in_memory().unwrap();
        let at = Local.with_ymd_and_hms(2024, 3, 9, 20, 30, 0).unwrap();

        let killed = AuditEventType::ActivityKilled {
            activity: "GTA".into(),
            reason: ViolationReason::OutsideTimeRange,
            pids: vec![1, 42],
        };
        store.append_audit(AuditEvent::at(at, killed.clone())).unwrap();

        let events = store.get_recent_audits(10).unwrap();
        assert_eq!(events[0].event, killed);
        assert_eq!(events[0].timestamp, at);
    }

    #[test]
    fn test_file_store_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dad-controller.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .append_audit(AuditEvent::new(AuditEventType::DayRolledOver { day: 0 }))
                .unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let events = store.get_recent_audits(10).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, AuditEventType::DayRolledOver { day: 0 });
    }
}
