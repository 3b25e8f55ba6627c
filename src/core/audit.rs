//! Audit sink implementations.
//!
//! The scheduler reports every lifecycle step to an optional [`AuditSink`].
//! [`InMemoryAuditSink`] keeps a bounded buffer for tests and development.

use std::collections::VecDeque;
use std::fmt;

use parking_lot::Mutex;
use serde::Serialize;

use crate::core::{TaskId, TaskStatus};
use crate::util::clock::now_ms;

/// Lifecycle action recorded by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Record created and queued.
    Submit,
    /// Submission rejected after the record was created.
    Reject,
    /// Execution started on a worker.
    Start,
    /// Execution succeeded.
    Complete,
    /// Execution failed and was requeued.
    Retry,
    /// Record moved to `Failed`.
    Fail,
    /// Record moved to `Cancelled`.
    Cancel,
}

impl AuditAction {
    /// Status the record holds after this action.
    #[must_use]
    pub const fn resulting_status(self) -> TaskStatus {
        match self {
            Self::Submit | Self::Retry => TaskStatus::Pending,
            Self::Start => TaskStatus::Running,
            Self::Complete => TaskStatus::Completed,
            Self::Reject | Self::Fail => TaskStatus::Failed,
            Self::Cancel => TaskStatus::Cancelled,
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Submit => "submit",
            Self::Reject => "reject",
            Self::Start => "start",
            Self::Complete => "complete",
            Self::Retry => "retry",
            Self::Fail => "fail",
            Self::Cancel => "cancel",
        };
        f.write_str(s)
    }
}

/// Audit event structure.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    /// Related task identifier.
    pub task_id: TaskId,
    /// Action taken.
    pub action: AuditAction,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
    /// Additional context (error text, worker id).
    pub detail: Option<String>,
}

/// Audit sink abstraction.
///
/// Called from the submitting thread, the dispatcher and every worker, so
/// implementations synchronize internally.
pub trait AuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: AuditEvent);
}

/// In-memory audit sink for testing and dev.
pub struct InMemoryAuditSink {
    events: Mutex<VecDeque<AuditEvent>>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(max_events.min(1024))),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Events for one task, oldest first.
    pub fn events_for(&self, id: &TaskId) -> Vec<AuditEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| &e.task_id == id)
            .cloned()
            .collect()
    }

    /// Task identifiers in the order their executions started.
    pub fn start_order(&self) -> Vec<TaskId> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.action == AuditAction::Start)
            .map(|e| e.task_id.clone())
            .collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}

/// Helper to build an audit event stamped with the current time.
pub fn build_audit_event(
    task_id: &TaskId,
    action: AuditAction,
    detail: Option<String>,
) -> AuditEvent {
    AuditEvent {
        task_id: task_id.clone(),
        action,
        created_at_ms: now_ms(),
        detail,
    }
}
