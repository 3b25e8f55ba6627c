//! State shared by the public handle, the dispatcher and the workers.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Sender, TrySendError};
use parking_lot::RwLock;
use tracing::{debug, error, info};

use crate::config::SchedulerConfig;

use super::audit::{build_audit_event, AuditAction, AuditSink};
use super::stats::PoolCounters;
use super::{IdGenerator, QueuedTask, SchedulerError, TaskId, TaskRegistry};

pub(crate) struct SchedulerShared {
    pub config: SchedulerConfig,
    pub registry: TaskRegistry,
    pub counters: PoolCounters,
    pub ids: Arc<dyn IdGenerator>,
    audit: Option<Arc<dyn AuditSink>>,
    /// Producer side of the submission queue. `None` once submissions are closed;
    /// every send happens under the read lock, so after `close_submissions`
    /// returns nothing more can enter the queue.
    submit_tx: RwLock<Option<Sender<QueuedTask>>>,
    seq: AtomicU64,
    closed: AtomicBool,
}

impl SchedulerShared {
    pub fn new(
        config: SchedulerConfig,
        ids: Arc<dyn IdGenerator>,
        audit: Option<Arc<dyn AuditSink>>,
        submit_tx: Sender<QueuedTask>,
    ) -> Self {
        Self {
            config,
            registry: TaskRegistry::new(),
            counters: PoolCounters::default(),
            ids,
            audit,
            submit_tx: RwLock::new(Some(submit_tx)),
            seq: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Next submission sequence number.
    pub fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stop accepting submissions and retries. Idempotent.
    pub fn close_submissions(&self) {
        self.closed.store(true, Ordering::Release);
        if self.submit_tx.write().take().is_some() {
            debug!("Submission queue closed");
        }
    }

    /// Non-blocking enqueue onto the submission queue.
    pub fn enqueue(&self, entry: QueuedTask) -> Result<(), SchedulerError> {
        let guard = self.submit_tx.read();
        let Some(tx) = guard.as_ref() else {
            return Err(SchedulerError::PoolClosed);
        };
        match tx.try_send(entry) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(SchedulerError::QueueFull),
            Err(TrySendError::Disconnected(_)) => Err(SchedulerError::PoolClosed),
        }
    }

    pub fn audit(&self, id: &TaskId, action: AuditAction, detail: Option<String>) {
        if let Some(sink) = self.audit.as_ref() {
            sink.record(build_audit_event(id, action, detail));
        }
    }

    /// Move a record to `Failed` with `reason`, unless it already left the
    /// state that allows it (for example a concurrent cancel).
    pub fn fail_record(&self, id: &TaskId, reason: SchedulerError) {
        let label = reason.as_label();
        let detail = reason.to_string();
        match self.registry.fail(id, reason) {
            Ok(()) => {
                PoolCounters::incr(&self.counters.failed_tasks);
                error!(task_id = %id, reason = label, "Task failed");
                self.audit(id, AuditAction::Fail, Some(detail));
            }
            Err(err) => {
                debug!(task_id = %id, error = %err, "Task already settled, failure not recorded");
            }
        }
    }

    /// Cancel a record that is still waiting in a queue.
    pub fn cancel_queued(&self, id: &TaskId, why: &'static str) {
        match self.registry.cancel(id) {
            Ok(()) => {
                PoolCounters::incr(&self.counters.cancelled_tasks);
                info!(task_id = %id, reason = why, "Queued task cancelled");
                self.audit(id, AuditAction::Cancel, Some(why.to_owned()));
            }
            Err(err) => {
                debug!(task_id = %id, error = %err, "Queued task not cancellable");
            }
        }
    }
}
