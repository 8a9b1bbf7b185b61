//! pay-sync
//!
//! Sync driver and engine orchestration.
//!
//! - [`SyncDriver::run_cycle`] runs one fetch-next cycle for a single
//!   (connector, entity kind) cursor: load state, fetch, reconcile, persist,
//!   loop while the adapter reports more pages
//! - cursor state is persisted only after the page is reconciled; a crash in
//!   between replays the page, which the ledger deduplicates by key
//! - child workflow nodes are fanned out through the external scheduler,
//!   one task per parent item
//! - [`Engine`] wires install/uninstall, actions, webhooks and trade
//!   settlement around the same handle, reconciler and stores
//!
//! The driver never retries internally. A retryable [`SyncError`] is handed
//! back to the scheduler, which re-runs the task from the last persisted
//! cursor.

mod driver;
mod engine;

pub use driver::{SyncDriver, SyncPhase, SyncReport};
pub use engine::{ActionKind, ActionProgress, Engine, EngineError, EngineSettings};

use pay_connector::ConnectorError;
use pay_reconcile::ReconcileError;
use pay_storage::{SchedulerError, StorageError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// Adapter failed in a way that a later attempt may not. The cursor was
    /// not advanced.
    #[error("transient adapter failure: {0}")]
    Transient(ConnectorError),
    /// Adapter failed for good. The pair halts until an operator intervenes.
    #[error("permanent adapter failure: {0}")]
    Permanent(ConnectorError),
    /// A fetched record failed validation. Nothing from its page was written.
    #[error(transparent)]
    Reconcile(ReconcileError),
    #[error(transparent)]
    Storage(StorageError),
    #[error(transparent)]
    Scheduler(SchedulerError),
    #[error("sync cycle cancelled")]
    Cancelled,
}

impl SyncError {
    /// Whether the scheduler should re-run the task.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::Transient(_)
                | SyncError::Storage(StorageError::Backend(_))
                | SyncError::Scheduler(SchedulerError::Backend(_))
        )
    }
}

impl From<ConnectorError> for SyncError {
    fn from(e: ConnectorError) -> Self {
        match e {
            ConnectorError::Cancelled => SyncError::Cancelled,
            e if e.is_retryable() => SyncError::Transient(e),
            e => SyncError::Permanent(e),
        }
    }
}

impl From<ReconcileError> for SyncError {
    fn from(e: ReconcileError) -> Self {
        match e {
            ReconcileError::Storage(s) => SyncError::Storage(s),
            other => SyncError::Reconcile(other),
        }
    }
}

impl From<StorageError> for SyncError {
    fn from(e: StorageError) -> Self {
        SyncError::Storage(e)
    }
}

impl From<SchedulerError> for SyncError {
    fn from(e: SchedulerError) -> Self {
        SyncError::Scheduler(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_errors_split_by_retryability() {
        let t: SyncError = ConnectorError::Transient("rate limited".into()).into();
        assert!(matches!(t, SyncError::Transient(_)));
        assert!(t.is_retryable());

        let timeout: SyncError = ConnectorError::Timeout {
            operation: "fetch_next_payments".into(),
            after_ms: 10,
        }
        .into();
        assert!(timeout.is_retryable());

        let p: SyncError = ConnectorError::Permanent("bad credentials".into()).into();
        assert!(matches!(p, SyncError::Permanent(_)));
        assert!(!p.is_retryable());

        let c: SyncError = ConnectorError::Cancelled.into();
        assert_eq!(c, SyncError::Cancelled);
        assert!(!c.is_retryable());
    }

    #[test]
    fn reconcile_storage_failures_stay_retryable() {
        let e: SyncError = ReconcileError::Storage(StorageError::Backend("io".into())).into();
        assert!(e.is_retryable());

        let v: SyncError = ReconcileError::Validation {
            kind: "payment",
            reference: "p1".into(),
            reason: "missing created_at".into(),
        }
        .into();
        assert!(matches!(v, SyncError::Reconcile(_)));
        assert!(!v.is_retryable());
    }
}
