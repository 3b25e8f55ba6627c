//! In-memory priority batch used by the dispatcher for each flush window.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::core::QueuedTask;

/// Wrapper to make `QueuedTask` orderable by priority (highest first) and FIFO within priority.
struct PriorityTask {
    task: QueuedTask,
}

impl PartialEq for PriorityTask {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PriorityTask {}

impl PartialOrd for PriorityTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PriorityTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher priority first
        match self.task.priority.cmp(&other.task.priority) {
            // FIFO within same priority: lower sequence wins (reversed for max-heap)
            Ordering::Equal => other.task.seq.cmp(&self.task.seq),
            other => other,
        }
    }
}

/// Batch of queued tasks ordered by `(priority desc, seq asc)`.
///
/// Sequence numbers are unique per scheduler, so the order is total and
/// deterministic. O(log n) push and pop.
#[derive(Default)]
pub struct PriorityBatch {
    tasks: BinaryHeap<PriorityTask>,
}

impl PriorityBatch {
    /// Create an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty batch with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tasks: BinaryHeap::with_capacity(capacity.min(1024)),
        }
    }

    /// Add an entry.
    pub fn push(&mut self, task: QueuedTask) {
        self.tasks.push(PriorityTask { task });
    }

    /// Remove the next entry to dispatch.
    pub fn pop(&mut self) -> Option<QueuedTask> {
        self.tasks.pop().map(|pt| pt.task)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Remove every entry in dispatch order.
    pub fn drain_ordered(&mut self) -> Vec<QueuedTask> {
        std::iter::from_fn(|| self.pop()).collect()
    }
}

impl Extend<QueuedTask> for PriorityBatch {
    fn extend<I: IntoIterator<Item = QueuedTask>>(&mut self, iter: I) {
        for task in iter {
            self.push(task);
        }
    }
}
