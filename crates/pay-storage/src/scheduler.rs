use std::time::Duration;

use async_trait::async_trait;
use pay_connector::TaskNode;
use pay_models::StateId;
use pay_ids::CompositeId;

use crate::SchedulerError;

/// A fetch task: which cursor it advances, the workflow node it runs, and
/// the parent payload when it is a child task.
#[derive(Clone, Debug, PartialEq)]
pub struct TaskDescriptor {
    pub state_id: StateId,
    pub node: TaskNode,
    pub from_payload: Option<serde_json::Value>,
}

impl TaskDescriptor {
    pub fn root(state_id: StateId, node: TaskNode) -> Self {
        Self {
            state_id,
            node,
            from_payload: None,
        }
    }

    /// Stable task id: one pending task per cursor.
    pub fn task_id(&self) -> String {
        self.state_id.encode()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Schedule {
    RunNow,
    RunPeriodically(Duration),
    RunInDuration(Duration),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RestartPolicy {
    #[default]
    Never,
    /// Re-run after a retryable failure.
    OnRetryableFailure,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduleOptions {
    pub schedule: Schedule,
    pub restart: RestartPolicy,
}

impl ScheduleOptions {
    pub fn run_now() -> Self {
        Self {
            schedule: Schedule::RunNow,
            restart: RestartPolicy::OnRetryableFailure,
        }
    }

    pub fn periodically(every: Duration) -> Self {
        Self {
            schedule: Schedule::RunPeriodically(every),
            restart: RestartPolicy::OnRetryableFailure,
        }
    }
}

/// External workflow scheduler. It decides when tasks run and how they are
/// retried, and never runs two cycles for the same [`StateId`] at once.
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Fails with [`SchedulerError::AlreadyScheduled`] when a task with the
    /// same id is pending.
    async fn schedule(&self, task: TaskDescriptor, opts: ScheduleOptions) -> Result<(), SchedulerError>;
}
