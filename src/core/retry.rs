//! Retry manager: routes an execution outcome to its final or requeued state.

use std::time::Duration;

use tracing::{error, info, warn};

use super::audit::AuditAction;
use super::registry::FailureOutcome;
use super::shared::SchedulerShared;
use super::stats::PoolCounters;
use super::{QueuedTask, SchedulerError, TaskId};

/// Settle one execution.
///
/// - success: `Running -> Completed`
/// - failure within budget: `Running -> Pending` and resubmission; if the
///   submission queue is full the record fails with `RetryQueueFull`, if the
///   scheduler is closing it fails with `PoolClosed`
/// - failure with the budget spent: `Running -> Failed`, error retained
pub(crate) fn settle(
    shared: &SchedulerShared,
    id: &TaskId,
    outcome: Result<(), SchedulerError>,
    elapsed: Duration,
) {
    match outcome {
        Ok(()) => complete(shared, id, elapsed),
        Err(err) => retry_or_fail(shared, id, err),
    }
}

fn complete(shared: &SchedulerShared, id: &TaskId, elapsed: Duration) {
    match shared.registry.complete(id) {
        Ok(()) => {
            PoolCounters::incr(&shared.counters.completed_tasks);
            info!(task_id = %id, duration_ms = elapsed.as_millis(), "Task completed");
            shared.audit(id, AuditAction::Complete, None);
        }
        Err(err) => error!(task_id = %id, error = %err, "Failed to record completion"),
    }
}

fn retry_or_fail(shared: &SchedulerShared, id: &TaskId, err: SchedulerError) {
    let seq = shared.next_seq();
    let detail = err.to_string();

    match shared.registry.settle_failure(id, err, seq) {
        Ok(FailureOutcome::Retry { attempt, priority }) => {
            PoolCounters::incr(&shared.counters.retried_tasks);
            warn!(task_id = %id, retries = attempt, error = %detail, "Task failed, retrying");
            shared.audit(id, AuditAction::Retry, Some(detail));

            let entry = QueuedTask {
                id: id.clone(),
                priority,
                seq,
                held_cycles: 0,
            };
            match shared.enqueue(entry) {
                Ok(()) => {}
                Err(SchedulerError::QueueFull) => {
                    shared.fail_record(id, SchedulerError::RetryQueueFull);
                }
                Err(other) => shared.fail_record(id, other),
            }
        }
        Ok(FailureOutcome::Exhausted) => {
            PoolCounters::incr(&shared.counters.failed_tasks);
            error!(task_id = %id, error = %detail, "Task execution failed, retry budget exhausted");
            shared.audit(id, AuditAction::Fail, Some(detail));
        }
        Err(settle_err) => {
            error!(task_id = %id, error = %settle_err, "Failed to record task failure");
        }
    }
}
