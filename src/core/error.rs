//! Error types for scheduler operations.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::core::{TaskId, TaskStatus};

/// Errors produced by scheduler components.
///
/// Submission-time variants are returned to the caller; execution-time
/// variants are stored on the task's record as its `last_error`.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SchedulerError {
    /// The submission buffer is saturated.
    #[error("submission queue is full")]
    QueueFull,
    /// A retry could not be re-enqueued because the submission buffer is saturated.
    #[error("retry could not be enqueued: submission queue is full")]
    RetryQueueFull,
    /// The record stayed undispatched for too many flush cycles.
    #[error("task was not dispatched within {cycles} flush cycles")]
    DispatchTimeout {
        /// Flush cycles the record was held for.
        cycles: u32,
    },
    /// No record exists for the identifier.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    /// The requested status change is not allowed from the current status.
    #[error("invalid transition for task {id}: {from} -> {to}")]
    InvalidTransition {
        /// Task identifier.
        id: TaskId,
        /// Current status.
        from: TaskStatus,
        /// Requested status.
        to: TaskStatus,
    },
    /// The task reported a failure or panicked.
    #[error("execution error: {0}")]
    ExecutionError(String),
    /// The task's timeout fired before it finished.
    #[error("deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),
    /// The scheduler has been stopped or its ambient token cancelled.
    #[error("scheduler is closed")]
    PoolClosed,
    /// The identifier generator produced an identifier already in the registry.
    #[error("duplicate task id: {0}")]
    DuplicateTaskId(TaskId),
    /// `start` was called on a running scheduler.
    #[error("scheduler already started")]
    AlreadyStarted,
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A dispatcher or worker thread could not be spawned.
    #[error("failed to spawn thread: {0}")]
    SpawnFailed(String),
}

impl SchedulerError {
    /// Returns a short stable label (snake_case) for use in logs.
    #[must_use]
    pub const fn as_label(&self) -> &'static str {
        match self {
            Self::QueueFull => "queue_full",
            Self::RetryQueueFull => "retry_queue_full",
            Self::DispatchTimeout { .. } => "dispatch_timeout",
            Self::TaskNotFound(_) => "task_not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::ExecutionError(_) => "execution_error",
            Self::DeadlineExceeded(_) => "deadline_exceeded",
            Self::PoolClosed => "pool_closed",
            Self::DuplicateTaskId(_) => "duplicate_task_id",
            Self::AlreadyStarted => "already_started",
            Self::InvalidConfig(_) => "invalid_config",
            Self::SpawnFailed(_) => "spawn_failed",
        }
    }
}

/// Application-facing result using anyhow for task bodies and higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(SchedulerError::QueueFull.to_string(), "submission queue is full");
        assert_eq!(
            SchedulerError::DispatchTimeout { cycles: 3 }.to_string(),
            "task was not dispatched within 3 flush cycles"
        );
        let err = SchedulerError::InvalidTransition {
            id: TaskId::from("t-1"),
            from: TaskStatus::Running,
            to: TaskStatus::Cancelled,
        };
        assert_eq!(err.to_string(), "invalid transition for task t-1: running -> cancelled");
    }

    #[test]
    fn test_labels() {
        assert_eq!(SchedulerError::PoolClosed.as_label(), "pool_closed");
        assert_eq!(
            SchedulerError::DeadlineExceeded(Duration::from_millis(5)).as_label(),
            "deadline_exceeded"
        );
    }

    #[test]
    fn test_serialize_tagged() {
        let json = serde_json::to_value(SchedulerError::ExecutionError("boom".into())).unwrap();
        assert_eq!(json["kind"], "execution_error");
        assert_eq!(json["detail"], "boom");
    }
}
