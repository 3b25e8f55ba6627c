//! Task lifecycle status and record snapshots.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{SchedulerError, TaskId};

/// Status of a task in the scheduler lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting in the submission or dispatch queue.
    Pending,
    /// Executing on a worker.
    Running,
    /// Finished successfully.
    Completed,
    /// Failed with its retry budget exhausted, or rejected by a queue.
    Failed,
    /// Cancelled before it started running.
    Cancelled,
}

impl TaskStatus {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether `self -> next` is a legal lifecycle transition.
    ///
    /// `Running -> Pending` is only used to requeue a retry; a running task
    /// can never be cancelled.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running | Self::Cancelled | Self::Failed)
                | (Self::Running, Self::Completed | Self::Failed | Self::Pending)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only snapshot of a task's lifecycle entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRecord {
    /// Unique identifier.
    pub id: TaskId,
    /// Task name captured at submission.
    pub name: String,
    /// Priority captured at submission.
    pub priority: i32,
    /// Timeout captured at submission (`Duration::ZERO` = unbounded).
    pub timeout: Duration,
    /// Retry budget captured at submission.
    pub retry_budget: u32,
    /// Current status.
    pub status: TaskStatus,
    /// Submission sequence number of the most recent enqueue.
    pub seq: u64,
    /// Creation timestamp (ms since epoch).
    pub created_at_ms: u128,
    /// Start of the most recent execution (ms since epoch).
    pub started_at_ms: Option<u128>,
    /// Time the record last left `Running` or reached a terminal status (ms since epoch).
    pub ended_at_ms: Option<u128>,
    /// Most recent failure, if any.
    pub last_error: Option<SchedulerError>,
    /// Re-executions performed so far.
    pub retries: u32,
}

impl TaskRecord {
    /// Wall-clock execution time of the most recent run, when it has finished.
    #[must_use]
    pub fn run_duration(&self) -> Option<Duration> {
        let started = self.started_at_ms?;
        let ended = self.ended_at_ms?;
        let ms = u64::try_from(ended.checked_sub(started)?).ok()?;
        Some(Duration::from_millis(ms))
    }
}

/// Queue entry carried through the submission and dispatch queues.
///
/// Only the identifier travels through the queues; the registry stays the
/// owner of the record itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedTask {
    /// Record identifier.
    pub id: TaskId,
    /// Priority captured at submission.
    pub priority: i32,
    /// Submission sequence number, used as the priority tie-break.
    pub seq: u64,
    /// Flush cycles this entry has been held back because the dispatch queue was full.
    pub held_cycles: u32,
}
