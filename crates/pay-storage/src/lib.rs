//! pay-storage
//!
//! Interfaces the engine consumes from its persistence and scheduling
//! collaborators, plus in-memory implementations for tests and embedding.
//!
//! - [`LedgerStore`]: keyed upserts; a repeated key is a no-op, never an error
//! - [`StateStore`]: one cursor per [`StateId`], written atomically
//! - [`Scheduler`]: fetch task scheduling with a distinguishable
//!   "already scheduled" condition
//!
//! No database is mandated. A SQL-backed store implements the same traits.

mod ledger;
mod memory;
mod scheduler;

pub use ledger::{LedgerStore, StateStore, WriteOutcome};
pub use memory::{InMemoryLedger, InMemoryScheduler, InMemoryStateStore};
pub use scheduler::{RestartPolicy, Schedule, ScheduleOptions, Scheduler, TaskDescriptor};

pub use pay_models::StateId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        StorageError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    /// A task with the same id is already pending. Callers treat this as
    /// success.
    #[error("task already scheduled: {0}")]
    AlreadyScheduled(String),
    #[error("scheduler backend error: {0}")]
    Backend(String),
}

impl SchedulerError {
    pub fn is_already_scheduled(&self) -> bool {
        matches!(self, SchedulerError::AlreadyScheduled(_))
    }
}
