//! Store trait definitions

use crate::{AuditEvent, StoreResult};

/// Audit store used by the engine and the daemon
pub trait Store: Send + Sync {
    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events, newest first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
