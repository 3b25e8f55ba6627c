//! Pool statistics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Statistics about scheduler utilization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Number of worker threads.
    pub worker_count: usize,
    /// Records in the registry.
    pub registered_tasks: usize,
    /// Tasks accepted onto the submission queue.
    pub submitted_tasks: u64,
    /// Submissions rejected after the record was created.
    pub rejected_tasks: u64,
    /// Entries forwarded to the dispatch queue (retries included).
    pub dispatched_tasks: u64,
    /// Currently executing tasks.
    pub active_tasks: u64,
    /// Tasks completed successfully.
    pub completed_tasks: u64,
    /// Tasks that ended `Failed` after being accepted.
    pub failed_tasks: u64,
    /// Tasks cancelled before running.
    pub cancelled_tasks: u64,
    /// Retries requeued.
    pub retried_tasks: u64,
}

/// Internal counters for pool statistics (thread-safe).
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub submitted_tasks: AtomicU64,
    pub rejected_tasks: AtomicU64,
    pub dispatched_tasks: AtomicU64,
    pub active_tasks: AtomicU64,
    pub completed_tasks: AtomicU64,
    pub failed_tasks: AtomicU64,
    pub cancelled_tasks: AtomicU64,
    pub retried_tasks: AtomicU64,
}

impl PoolCounters {
    /// Get a snapshot of current statistics.
    pub fn snapshot(&self, worker_count: usize, registered_tasks: usize) -> PoolStats {
        PoolStats {
            worker_count,
            registered_tasks,
            submitted_tasks: self.submitted_tasks.load(Ordering::Relaxed),
            rejected_tasks: self.rejected_tasks.load(Ordering::Relaxed),
            dispatched_tasks: self.dispatched_tasks.load(Ordering::Relaxed),
            active_tasks: self.active_tasks.load(Ordering::Relaxed),
            completed_tasks: self.completed_tasks.load(Ordering::Relaxed),
            failed_tasks: self.failed_tasks.load(Ordering::Relaxed),
            cancelled_tasks: self.cancelled_tasks.load(Ordering::Relaxed),
            retried_tasks: self.retried_tasks.load(Ordering::Relaxed),
        }
    }

    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decr(counter: &AtomicU64) {
        counter.fetch_sub(1, Ordering::Relaxed);
    }
}
