//! Task registry: the single source of truth for task lifecycle records.
//!
//! All mutations take the write half of one `parking_lot::RwLock` guarding the
//! map; snapshots take the read half. Every status change goes through
//! [`TaskStatus::can_transition_to`], so an illegal change is rejected with
//! [`SchedulerError::InvalidTransition`] and leaves the record untouched.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::util::clock::now_ms;

use super::{SchedulerError, TaskId, TaskRecord, TaskRef, TaskStatus};

/// Registry slot: the record plus the task object it wraps.
struct RegistryEntry {
    record: TaskRecord,
    task: TaskRef,
    /// Insertion order, stable across retries.
    order: u64,
}

/// Map of task identifier to lifecycle record.
pub struct TaskRegistry {
    entries: RwLock<HashMap<TaskId, RegistryEntry>>,
}

impl TaskRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a new `Pending` record for `task`.
    ///
    /// Scheduling attributes are read from the task exactly once here.
    ///
    /// # Errors
    ///
    /// `DuplicateTaskId` if `id` is already registered; the existing record is kept.
    pub fn register(
        &self,
        id: TaskId,
        task: TaskRef,
        seq: u64,
    ) -> Result<TaskRecord, SchedulerError> {
        let record = TaskRecord {
            id: id.clone(),
            name: task.name().to_owned(),
            priority: task.priority(),
            timeout: task.timeout(),
            retry_budget: task.retry_budget(),
            status: TaskStatus::Pending,
            seq,
            created_at_ms: now_ms(),
            started_at_ms: None,
            ended_at_ms: None,
            last_error: None,
            retries: 0,
        };

        let mut entries = self.entries.write();
        match entries.entry(id) {
            Entry::Occupied(occupied) => {
                Err(SchedulerError::DuplicateTaskId(occupied.key().clone()))
            }
            Entry::Vacant(vacant) => {
                vacant.insert(RegistryEntry {
                    record: record.clone(),
                    task,
                    order: seq,
                });
                Ok(record)
            }
        }
    }

    /// Snapshot of one record.
    pub fn get(&self, id: &TaskId) -> Option<TaskRecord> {
        self.entries.read().get(id).map(|e| e.record.clone())
    }

    /// Current status of one record.
    pub fn status(&self, id: &TaskId) -> Option<TaskStatus> {
        self.entries.read().get(id).map(|e| e.record.status)
    }

    /// Snapshots of every record, in submission order.
    pub fn list(&self) -> Vec<TaskRecord> {
        let entries = self.entries.read();
        let mut ordered: Vec<_> = entries.values().collect();
        ordered.sort_by_key(|e| e.order);
        ordered.into_iter().map(|e| e.record.clone()).collect()
    }

    /// Number of registered records.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the registry holds no records.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// `Pending -> Cancelled`.
    ///
    /// # Errors
    ///
    /// `TaskNotFound`, or `InvalidTransition` for any status other than `Pending`.
    pub fn cancel(&self, id: &TaskId) -> Result<(), SchedulerError> {
        self.transition(id, TaskStatus::Cancelled, |record| {
            record.ended_at_ms = Some(now_ms());
        })
    }

    /// `Pending -> Running`, returning the task object and its captured timeout.
    ///
    /// # Errors
    ///
    /// `TaskNotFound`, or `InvalidTransition` if the record is no longer pending
    /// (for example it was cancelled while queued).
    pub fn begin_run(&self, id: &TaskId) -> Result<(TaskRef, Duration), SchedulerError> {
        let mut entries = self.entries.write();
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| SchedulerError::TaskNotFound(id.clone()))?;
        apply(&mut entry.record, TaskStatus::Running, |record| {
            record.started_at_ms = Some(now_ms());
            record.ended_at_ms = None;
        })?;
        Ok((Arc::clone(&entry.task), entry.record.timeout))
    }

    /// `Running -> Completed`.
    ///
    /// # Errors
    ///
    /// `TaskNotFound` or `InvalidTransition`.
    pub fn complete(&self, id: &TaskId) -> Result<(), SchedulerError> {
        self.transition(id, TaskStatus::Completed, |record| {
            record.ended_at_ms = Some(now_ms());
        })
    }

    /// Move to `Failed`, retaining `error` as the record's last error.
    ///
    /// # Errors
    ///
    /// `TaskNotFound` or `InvalidTransition` (a terminal record is never overwritten).
    pub fn fail(&self, id: &TaskId, error: SchedulerError) -> Result<(), SchedulerError> {
        self.transition(id, TaskStatus::Failed, |record| {
            record.ended_at_ms = Some(now_ms());
            record.last_error = Some(error);
        })
    }

    /// Settle a failed run: requeue it as `Pending` when the retry budget
    /// allows, otherwise move it to `Failed`.
    ///
    /// The budget check and the transition happen under one write lock.
    ///
    /// # Errors
    ///
    /// `TaskNotFound` or `InvalidTransition` if the record is not `Running`.
    pub fn settle_failure(
        &self,
        id: &TaskId,
        error: SchedulerError,
        retry_seq: u64,
    ) -> Result<FailureOutcome, SchedulerError> {
        let mut entries = self.entries.write();
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| SchedulerError::TaskNotFound(id.clone()))?;
        let record = &mut entry.record;

        if record.retries < record.retry_budget {
            apply(record, TaskStatus::Pending, |record| {
                record.retries += 1;
                record.seq = retry_seq;
                record.ended_at_ms = Some(now_ms());
                record.last_error = Some(error);
            })?;
            Ok(FailureOutcome::Retry {
                attempt: record.retries,
                priority: record.priority,
            })
        } else {
            apply(record, TaskStatus::Failed, |record| {
                record.ended_at_ms = Some(now_ms());
                record.last_error = Some(error);
            })?;
            Ok(FailureOutcome::Exhausted)
        }
    }

    fn transition(
        &self,
        id: &TaskId,
        to: TaskStatus,
        update: impl FnOnce(&mut TaskRecord),
    ) -> Result<(), SchedulerError> {
        let mut entries = self.entries.write();
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| SchedulerError::TaskNotFound(id.clone()))?;
        apply(&mut entry.record, to, update)
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of [`TaskRegistry::settle_failure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// The record is `Pending` again and must be resubmitted.
    Retry {
        /// Retry count after this failure (1-based).
        attempt: u32,
        /// Priority to resubmit with.
        priority: i32,
    },
    /// The retry budget is spent; the record is `Failed`.
    Exhausted,
}

fn apply(
    record: &mut TaskRecord,
    to: TaskStatus,
    update: impl FnOnce(&mut TaskRecord),
) -> Result<(), SchedulerError> {
    if !record.status.can_transition_to(to) {
        return Err(SchedulerError::InvalidTransition {
            id: record.id.clone(),
            from: record.status,
            to,
        });
    }
    record.status = to;
    update(record);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TaskFn;
    use tokio_util::sync::CancellationToken;

    fn task(retry_budget: u32) -> TaskRef {
        Arc::new(
            TaskFn::new("unit", |_ctx: CancellationToken| async { Ok(()) })
                .with_priority(3)
                .with_timeout(Duration::from_secs(1))
                .with_retry_budget(retry_budget),
        )
    }

    fn id(s: &str) -> TaskId {
        TaskId::from(s)
    }

    #[test]
    fn test_register_captures_attributes() {
        let registry = TaskRegistry::new();
        let record = registry.register(id("a"), task(2), 7).unwrap();
        assert_eq!(record.status, TaskStatus::Pending);
        assert_eq!(record.priority, 3);
        assert_eq!(record.timeout, Duration::from_secs(1));
        assert_eq!(record.retry_budget, 2);
        assert_eq!(record.seq, 7);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_id_rejected_without_overwrite() {
        let registry = TaskRegistry::new();
        registry.register(id("a"), task(0), 1).unwrap();
        registry.cancel(&id("a")).unwrap();

        let err = registry.register(id("a"), task(0), 2).unwrap_err();
        assert_eq!(err, SchedulerError::DuplicateTaskId(id("a")));
        assert_eq!(registry.status(&id("a")), Some(TaskStatus::Cancelled));
    }

    #[test]
    fn test_cancel_only_pending() {
        let registry = TaskRegistry::new();
        registry.register(id("a"), task(0), 1).unwrap();
        registry.begin_run(&id("a")).unwrap();

        let err = registry.cancel(&id("a")).unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::InvalidTransition {
                from: TaskStatus::Running,
                to: TaskStatus::Cancelled,
                ..
            }
        ));
        assert_eq!(registry.status(&id("a")), Some(TaskStatus::Running));
    }

    #[test]
    fn test_cancel_unknown() {
        let registry = TaskRegistry::new();
        assert_eq!(
            registry.cancel(&id("missing")).unwrap_err(),
            SchedulerError::TaskNotFound(id("missing"))
        );
    }

    #[test]
    fn test_begin_run_after_cancel_fails() {
        let registry = TaskRegistry::new();
        registry.register(id("a"), task(0), 1).unwrap();
        registry.cancel(&id("a")).unwrap();
        assert!(registry.begin_run(&id("a")).is_err());
        assert_eq!(registry.status(&id("a")), Some(TaskStatus::Cancelled));
    }

    #[test]
    fn test_settle_failure_retries_then_exhausts() {
        let registry = TaskRegistry::new();
        registry.register(id("a"), task(1), 1).unwrap();
        let boom = SchedulerError::ExecutionError("boom".into());

        registry.begin_run(&id("a")).unwrap();
        let outcome = registry.settle_failure(&id("a"), boom.clone(), 10).unwrap();
        assert_eq!(outcome, FailureOutcome::Retry { attempt: 1, priority: 3 });
        let record = registry.get(&id("a")).unwrap();
        assert_eq!(record.status, TaskStatus::Pending);
        assert_eq!(record.seq, 10);
        assert_eq!(record.last_error, Some(boom.clone()));

        registry.begin_run(&id("a")).unwrap();
        let outcome = registry.settle_failure(&id("a"), boom.clone(), 11).unwrap();
        assert_eq!(outcome, FailureOutcome::Exhausted);
        let record = registry.get(&id("a")).unwrap();
        assert_eq!(record.status, TaskStatus::Failed);
        assert_eq!(record.retries, 1);
        assert_eq!(record.last_error, Some(boom));
    }

    #[test]
    fn test_terminal_record_is_never_overwritten() {
        let registry = TaskRegistry::new();
        registry.register(id("a"), task(0), 1).unwrap();
        registry.begin_run(&id("a")).unwrap();
        registry.complete(&id("a")).unwrap();

        assert!(registry.fail(&id("a"), SchedulerError::QueueFull).is_err());
        let record = registry.get(&id("a")).unwrap();
        assert_eq!(record.status, TaskStatus::Completed);
        assert!(record.last_error.is_none());
        assert!(record.ended_at_ms.is_some());
    }

    #[test]
    fn test_list_in_submission_order() {
        let registry = TaskRegistry::new();
        registry.register(id("c"), task(0), 3).unwrap();
        registry.register(id("a"), task(0), 1).unwrap();
        registry.register(id("b"), task(0), 2).unwrap();
        let ids: Vec<_> = registry.list().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![id("a"), id("b"), id("c")]);
    }
}
