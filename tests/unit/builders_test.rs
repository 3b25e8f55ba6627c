//! Tests for scheduler builders

use std::sync::Arc;

use prometheus_task_scheduler::builders::SchedulerBuilder;
use prometheus_task_scheduler::config::SchedulerConfig;
use prometheus_task_scheduler::core::{
    AuditAction, InMemoryAuditSink, SchedulerError, SequentialIdGenerator, TaskFn, TaskId,
    TaskScheduler, TaskStatus,
};
use tokio_util::sync::CancellationToken;

#[test]
fn test_builder_rejects_invalid_config() {
    let result =
        SchedulerBuilder::new(SchedulerConfig::new().with_dispatch_queue_capacity(0)).build();
    assert!(matches!(result, Err(SchedulerError::InvalidConfig(_))));

    let result = TaskScheduler::new(SchedulerConfig::new().with_worker_count(0));
    assert!(matches!(result, Err(SchedulerError::InvalidConfig(_))));
}

#[test]
fn test_builder_wires_id_generator_and_audit() {
    let audit = Arc::new(InMemoryAuditSink::new(100));
    let scheduler = SchedulerBuilder::new(SchedulerConfig::new().with_worker_count(1))
        .with_id_generator(Arc::new(SequentialIdGenerator::new("job")))
        .with_audit(audit.clone())
        .build()
        .unwrap();

    let id = scheduler
        .submit(TaskFn::new("noop", |_ctx: CancellationToken| async { Ok(()) }))
        .unwrap();
    assert_eq!(id, TaskId::from("job-1"));

    let record = scheduler.get_info(&id).unwrap();
    assert_eq!(record.status, TaskStatus::Pending);
    assert_eq!(record.name, "noop");

    let actions: Vec<_> = audit.events_for(&id).into_iter().map(|e| e.action).collect();
    assert_eq!(actions, vec![AuditAction::Submit]);

    scheduler.stop().unwrap();
    assert_eq!(scheduler.get_info(&id).unwrap().status, TaskStatus::Cancelled);
}

#[test]
fn test_default_scheduler_uses_uuid_ids() {
    let scheduler = TaskScheduler::new(SchedulerConfig::new().with_worker_count(1)).unwrap();
    let id = scheduler
        .submit(TaskFn::new("noop", |_ctx: CancellationToken| async { Ok(()) }))
        .unwrap();
    assert!(id.as_str().starts_with("task-"));
    assert_eq!(scheduler.stats().registered_tasks, 1);
}
