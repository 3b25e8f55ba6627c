//! Tests for the task registry under concurrent access

use std::sync::Arc;
use std::thread;

use prometheus_task_scheduler::core::{
    FailureOutcome, SchedulerError, TaskFn, TaskId, TaskRef, TaskRegistry, TaskStatus,
};
use tokio_util::sync::CancellationToken;

fn make_task(priority: i32, retry_budget: u32) -> TaskRef {
    Arc::new(
        TaskFn::new("registry", |_ctx: CancellationToken| async { Ok(()) })
            .with_priority(priority)
            .with_retry_budget(retry_budget),
    )
}

#[test]
fn test_cancel_races_begin_run() {
    for round in 0..50 {
        let registry = Arc::new(TaskRegistry::new());
        let id = TaskId::from(format!("race-{round}"));
        registry.register(id.clone(), make_task(0, 0), round).unwrap();

        let canceller = {
            let registry = Arc::clone(&registry);
            let id = id.clone();
            thread::spawn(move || registry.cancel(&id).is_ok())
        };
        let runner = {
            let registry = Arc::clone(&registry);
            let id = id.clone();
            thread::spawn(move || registry.begin_run(&id).is_ok())
        };

        let cancelled = canceller.join().unwrap();
        let started = runner.join().unwrap();
        assert!(cancelled ^ started, "exactly one side must win");

        let expected = if cancelled {
            TaskStatus::Cancelled
        } else {
            TaskStatus::Running
        };
        assert_eq!(registry.status(&id), Some(expected));
    }
}

#[test]
fn test_concurrent_registration() {
    let registry = Arc::new(TaskRegistry::new());
    let handles: Vec<_> = (0..8u64)
        .map(|t| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for i in 0..100u64 {
                    let seq = t * 100 + i;
                    registry
                        .register(TaskId::from(format!("t{t}-{i}")), make_task(0, 0), seq)
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.len(), 800);
    let seqs: Vec<u64> = registry.list().iter().map(|r| r.seq).collect();
    assert!(seqs.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_retry_cycle_through_public_api() {
    let registry = TaskRegistry::new();
    let id = TaskId::from("retry");
    registry.register(id.clone(), make_task(7, 1), 0).unwrap();

    registry.begin_run(&id).unwrap();
    let outcome = registry
        .settle_failure(&id, SchedulerError::ExecutionError("first".into()), 10)
        .unwrap();
    assert_eq!(outcome, FailureOutcome::Retry { attempt: 1, priority: 7 });

    let record = registry.get(&id).unwrap();
    assert_eq!(record.status, TaskStatus::Pending);
    assert_eq!(record.seq, 10);

    registry.begin_run(&id).unwrap();
    let outcome = registry
        .settle_failure(&id, SchedulerError::ExecutionError("second".into()), 11)
        .unwrap();
    assert_eq!(outcome, FailureOutcome::Exhausted);

    let record = registry.get(&id).unwrap();
    assert_eq!(record.status, TaskStatus::Failed);
    assert_eq!(record.retries, 1);
    assert_eq!(
        record.last_error,
        Some(SchedulerError::ExecutionError("second".into()))
    );
    assert!(registry.complete(&id).is_err());
}
