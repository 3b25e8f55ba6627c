//! Task identifiers and identifier generation.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Unique identifier of a submitted task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Source of task identifiers.
///
/// Generators should never repeat an identifier; the registry rejects
/// repeats with [`SchedulerError::DuplicateTaskId`](crate::core::SchedulerError::DuplicateTaskId)
/// rather than overwriting the existing record.
pub trait IdGenerator: Send + Sync {
    /// Produce the next identifier.
    fn next_id(&self) -> TaskId;
}

/// Random UUID v4 identifiers. This is the default generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self) -> TaskId {
        TaskId(format!("task-{}", uuid::Uuid::new_v4().simple()))
    }
}

/// Monotonic counter identifiers (`<prefix>-<n>`), unique per generator instance.
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdGenerator {
    /// Create a generator producing `<prefix>-1`, `<prefix>-2`, ...
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new("task")
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> TaskId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        TaskId(format!("{}-{n}", self.prefix))
    }
}
