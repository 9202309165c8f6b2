//! Scheduler errors.

use thiserror::Error;

use crate::execution::{ExecutionId, ExecutionStatus};

/// Scheduler error types.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Malformed schedule id.
    #[error("Invalid schedule id: '{0}'")]
    InvalidScheduleId(String),

    /// Schedule type string outside the known kinds.
    #[error("Unknown schedule type: '{0}'")]
    UnknownScheduleKind(String),

    /// No descriptor for (kind, id).
    #[error("Schedule not found: {0}")]
    ScheduleNotFound(String),

    /// Cron expression does not parse.
    #[error("Invalid cron expression '{expression}': {reason}")]
    InvalidCron { expression: String, reason: String },

    /// System cleanup jobs are always enabled.
    #[error("System job '{0}' cannot be disabled")]
    CannotDisableSystemJob(String),

    #[error("Unknown system job: '{0}'")]
    UnknownSystemJob(String),

    /// Execution status change outside the state machine.
    #[error("Invalid execution transition for #{id}: {from} -> {to}")]
    InvalidTransition {
        id: ExecutionId,
        from: ExecutionStatus,
        to: ExecutionStatus,
    },

    /// Execution record not found.
    #[error("Execution not found: #{0}")]
    ExecutionNotFound(ExecutionId),

    /// Persistence failure.
    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SchedulerError {
    /// Errors reported to the caller before any job body runs.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SchedulerError::InvalidScheduleId(_)
                | SchedulerError::UnknownScheduleKind(_)
                | SchedulerError::ScheduleNotFound(_)
                | SchedulerError::InvalidCron { .. }
                | SchedulerError::CannotDisableSystemJob(_)
                | SchedulerError::UnknownSystemJob(_)
        )
    }
}

/// Error raised by a job body. Only its message text is recorded.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("{0}")]
    Failed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl JobError {
    pub fn failed(message: impl Into<String>) -> Self {
        JobError::Failed(message.into())
    }
}
