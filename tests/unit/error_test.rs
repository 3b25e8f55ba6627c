//! Tests for error types

use std::time::Duration;

use prometheus_task_scheduler::core::{SchedulerError, TaskId, TaskStatus};

#[test]
fn test_queue_full_error() {
    let err = SchedulerError::QueueFull;
    assert_eq!(format!("{err}"), "submission queue is full");
    assert_eq!(err.as_label(), "queue_full");
}

#[test]
fn test_task_not_found_error() {
    let err = SchedulerError::TaskNotFound(TaskId::from("t-9"));
    assert_eq!(format!("{err}"), "task not found: t-9");
}

#[test]
fn test_deadline_exceeded_error() {
    let err = SchedulerError::DeadlineExceeded(Duration::from_millis(250));
    assert_eq!(format!("{err}"), "deadline exceeded after 250ms");
}

#[test]
fn test_pool_closed_error() {
    assert_eq!(format!("{}", SchedulerError::PoolClosed), "scheduler is closed");
}

#[test]
fn test_invalid_config_error() {
    let err = SchedulerError::InvalidConfig("worker_count must be greater than 0".into());
    assert_eq!(
        format!("{err}"),
        "invalid configuration: worker_count must be greater than 0"
    );
}

#[test]
fn test_errors_are_comparable_and_cloneable() {
    let err = SchedulerError::InvalidTransition {
        id: TaskId::from("t-1"),
        from: TaskStatus::Completed,
        to: TaskStatus::Running,
    };
    assert_eq!(err.clone(), err);
    assert_ne!(err, SchedulerError::AlreadyStarted);
}

#[test]
fn test_error_serializes_with_kind() {
    let json = serde_json::to_value(SchedulerError::DispatchTimeout { cycles: 4 }).unwrap();
    assert_eq!(json["kind"], "dispatch_timeout");
    assert_eq!(json["detail"]["cycles"], 4);

    let json = serde_json::to_value(SchedulerError::PoolClosed).unwrap();
    assert_eq!(json["kind"], "pool_closed");
}
