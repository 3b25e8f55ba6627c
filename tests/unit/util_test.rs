//! Tests for utility functions

use prometheus_task_scheduler::core::{
    IdGenerator, SequentialIdGenerator, TaskId, TaskStatus, UuidIdGenerator,
};
use prometheus_task_scheduler::util::{init_tracing, now_ms};

#[test]
fn test_now_ms() {
    let before = now_ms();
    let after = now_ms();
    assert!(after >= before);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    tracing::info!(component = "util_test", "tracing initialized");
}

#[test]
fn test_task_id() {
    let id = TaskId::from("job-42".to_string());
    assert_eq!(id.as_str(), "job-42");
    assert_eq!(id, TaskId::from("job-42"));
}

#[test]
fn test_id_generators() {
    let sequential = SequentialIdGenerator::default();
    assert_eq!(sequential.next_id(), TaskId::from("task-1"));
    assert_eq!(sequential.next_id(), TaskId::from("task-2"));

    let uuid = UuidIdGenerator;
    assert_ne!(uuid.next_id(), uuid.next_id());
}

#[test]
fn test_status_terminality() {
    assert!(!TaskStatus::Pending.is_terminal());
    assert!(!TaskStatus::Running.is_terminal());
    assert!(TaskStatus::Completed.is_terminal());
    assert!(TaskStatus::Failed.is_terminal());
    assert!(TaskStatus::Cancelled.is_terminal());
    assert_eq!(serde_json::to_string(&TaskStatus::Cancelled).unwrap(), "\"cancelled\"");
}
