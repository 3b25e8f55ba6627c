//! Tests for audit sink

use prometheus_task_scheduler::core::{
    AuditAction, AuditSink, InMemoryAuditSink, TaskId, TaskStatus, build_audit_event,
};

#[test]
fn test_in_memory_audit_sink() {
    let sink = InMemoryAuditSink::new(10);
    let id = TaskId::from("task1");

    sink.record(build_audit_event(&id, AuditAction::Submit, Some("priority=3".into())));
    assert_eq!(sink.events().len(), 1);

    let events = sink.events();
    assert_eq!(events[0].task_id, id);
    assert_eq!(events[0].action, AuditAction::Submit);
    assert_eq!(events[0].detail.as_deref(), Some("priority=3"));
}

#[test]
fn test_audit_sink_overflow() {
    let sink = InMemoryAuditSink::new(2);

    sink.record(build_audit_event(&TaskId::from("task1"), AuditAction::Submit, None));
    sink.record(build_audit_event(&TaskId::from("task2"), AuditAction::Submit, None));
    sink.record(build_audit_event(&TaskId::from("task3"), AuditAction::Submit, None));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].task_id, TaskId::from("task2"));
    assert_eq!(events[1].task_id, TaskId::from("task3"));
}

#[test]
fn test_build_audit_event() {
    let event = build_audit_event(&TaskId::from("task1"), AuditAction::Complete, None);
    assert_eq!(event.action.to_string(), "complete");
    assert!(event.created_at_ms > 0);
    assert!(event.detail.is_none());
}

#[test]
fn test_audit_event_serializes() {
    let event = build_audit_event(&TaskId::from("task1"), AuditAction::Retry, Some("boom".into()));
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["task_id"], "task1");
    assert_eq!(json["action"], "retry");
    assert_eq!(json["detail"], "boom");
}

#[test]
fn test_actions_map_to_statuses() {
    assert_eq!(AuditAction::Submit.resulting_status(), TaskStatus::Pending);
    assert_eq!(AuditAction::Start.resulting_status(), TaskStatus::Running);
    assert_eq!(AuditAction::Complete.resulting_status(), TaskStatus::Completed);
    assert_eq!(AuditAction::Fail.resulting_status(), TaskStatus::Failed);
    assert_eq!(AuditAction::Cancel.resulting_status(), TaskStatus::Cancelled);
}
