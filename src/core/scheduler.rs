//! Public scheduler handle.
//!
//! [`TaskScheduler`] owns the submission queue and the shared state, and
//! drives the thread lifecycle:
//!
//! - **Submission before start**: tasks wait on the bounded submission queue
//! - **start**: spawns N workers, the dispatcher and an ambient watcher
//! - **stop**: closes submission, lets the dispatcher flush, joins everything
//! - **Drop**: signals shutdown without joining

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::SchedulerConfig;

use super::audit::{AuditAction, AuditSink};
use super::dispatcher::Dispatcher;
use super::shared::SchedulerShared;
use super::stats::{PoolCounters, PoolStats};
use super::worker::Worker;
use super::{IdGenerator, QueuedTask, SchedulerError, Task, TaskId, TaskRecord, TaskRef};

const STOPPED_REASON: &str = "scheduler stopped before execution";

enum Lifecycle {
    Idle,
    Running(Handles),
    Stopped,
}

/// Threads spawned by `start`.
struct Handles {
    dispatcher: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
    watcher: JoinHandle<()>,
    /// Releases the watcher on a graceful stop.
    stopped: CancellationToken,
    /// Kept for the final sweep after the workers exit.
    dispatch_rx: Receiver<QueuedTask>,
}

impl Handles {
    fn join(self, shared: &SchedulerShared) {
        if self.dispatcher.join().is_err() {
            warn!("Dispatcher thread panicked");
        }

        let worker_count = self.workers.len();
        for (worker_id, handle) in self.workers.into_iter().enumerate() {
            match handle.join() {
                Ok(()) => debug!(worker_id, "Worker joined"),
                Err(_) => warn!(worker_id, "Worker thread panicked"),
            }
        }

        self.stopped.cancel();
        if self.watcher.join().is_err() {
            warn!("Watcher thread panicked");
        }

        for entry in self.dispatch_rx.try_iter() {
            shared.cancel_queued(&entry.id, STOPPED_REASON);
        }
        info!(worker_count, "Scheduler stopped");
    }
}

/// Priority task scheduler backed by dedicated OS threads.
///
/// ```rust,ignore
/// use prometheus_task_scheduler::config::SchedulerConfig;
/// use prometheus_task_scheduler::core::{TaskFn, TaskScheduler};
/// use tokio_util::sync::CancellationToken;
///
/// let scheduler = TaskScheduler::new(SchedulerConfig::new().with_worker_count(4))?;
/// scheduler.start(CancellationToken::new())?;
///
/// let id = scheduler.submit(TaskFn::new("index", |_ctx| async { Ok(()) }).with_priority(5))?;
/// // ...
/// scheduler.stop()?;
/// let record = scheduler.get_info(&id);
/// ```
pub struct TaskScheduler {
    shared: Arc<SchedulerShared>,
    /// Consumer side of the submission queue, handed to the dispatcher on `start`.
    submit_rx: Mutex<Option<Receiver<QueuedTask>>>,
    lifecycle: Mutex<Lifecycle>,
}

impl TaskScheduler {
    /// Create a scheduler with the default identifier generator and no audit sink.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidConfig` if the configuration is invalid.
    pub fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        crate::builders::SchedulerBuilder::new(config).build()
    }

    /// Assemble a scheduler from already-validated parts.
    pub(crate) fn from_parts(
        config: SchedulerConfig,
        ids: Arc<dyn IdGenerator>,
        audit: Option<Arc<dyn AuditSink>>,
    ) -> Self {
        let (submit_tx, submit_rx) = bounded(config.submission_queue_capacity);
        info!(
            worker_count = config.worker_count,
            submission_capacity = config.submission_queue_capacity,
            dispatch_capacity = config.dispatch_queue_capacity,
            tick_ms = config.tick_interval_ms,
            "TaskScheduler initialized"
        );
        Self {
            shared: Arc::new(SchedulerShared::new(config, ids, audit, submit_tx)),
            submit_rx: Mutex::new(Some(submit_rx)),
            lifecycle: Mutex::new(Lifecycle::Idle),
        }
    }

    /// Scheduler configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    /// Submit a task.
    ///
    /// Creates a `Pending` record, then enqueues it without blocking. Allowed
    /// before `start`; the task waits on the submission queue until the
    /// dispatcher runs.
    ///
    /// # Errors
    ///
    /// - `PoolClosed` after `stop` or ambient cancellation (no record is created)
    /// - `DuplicateTaskId` if the identifier generator repeats itself
    /// - `QueueFull` if the submission queue is saturated; the record is kept
    ///   as `Failed` with the same error
    pub fn submit<T: Task>(&self, task: T) -> Result<TaskId, SchedulerError> {
        self.submit_shared(Arc::new(task))
    }

    /// Submit a task that is already behind an `Arc`.
    ///
    /// # Errors
    ///
    /// Same as [`TaskScheduler::submit`].
    pub fn submit_shared(&self, task: TaskRef) -> Result<TaskId, SchedulerError> {
        if self.shared.is_closed() {
            return Err(SchedulerError::PoolClosed);
        }

        let id = self.shared.ids.next_id();
        let seq = self.shared.next_seq();
        let record = self
            .shared
            .registry
            .register(id.clone(), task, seq)
            .map_err(|err| {
                warn!(task_id = %id, error = %err, "Task registration rejected");
                err
            })?;
        self.shared.audit(&id, AuditAction::Submit, None);

        let entry = QueuedTask {
            id: id.clone(),
            priority: record.priority,
            seq,
            held_cycles: 0,
        };
        match self.shared.enqueue(entry) {
            Ok(()) => {
                PoolCounters::incr(&self.shared.counters.submitted_tasks);
                info!(
                    task_id = %id,
                    task_name = %record.name,
                    priority = record.priority,
                    "Task submitted"
                );
                Ok(id)
            }
            Err(err) => {
                if let Err(fail_err) = self.shared.registry.fail(&id, err.clone()) {
                    debug!(task_id = %id, error = %fail_err, "Rejected task already settled");
                }
                PoolCounters::incr(&self.shared.counters.rejected_tasks);
                self.shared.audit(&id, AuditAction::Reject, Some(err.to_string()));
                warn!(task_id = %id, reason = err.as_label(), "Task submission rejected");
                Err(err)
            }
        }
    }

    /// Snapshot of one task record.
    pub fn get_info(&self, id: &TaskId) -> Option<TaskRecord> {
        self.shared.registry.get(id)
    }

    /// Cancel a pending task. Returns `true` only if the record moved from
    /// `Pending` to `Cancelled`.
    pub fn cancel(&self, id: &TaskId) -> bool {
        self.try_cancel(id).is_ok()
    }

    /// Cancel a pending task, reporting why it could not be cancelled.
    ///
    /// # Errors
    ///
    /// `TaskNotFound`, or `InvalidTransition` when the task is running or finished.
    pub fn try_cancel(&self, id: &TaskId) -> Result<(), SchedulerError> {
        if let Err(err) = self.shared.registry.cancel(id) {
            debug!(task_id = %id, reason = err.as_label(), "Cancel refused");
            return Err(err);
        }
        PoolCounters::incr(&self.shared.counters.cancelled_tasks);
        info!(task_id = %id, "Task cancelled");
        self.shared.audit(id, AuditAction::Cancel, None);
        Ok(())
    }

    /// Snapshots of every record, in submission order.
    pub fn list(&self) -> Vec<TaskRecord> {
        self.shared.registry.list()
    }

    /// Current pool statistics.
    pub fn stats(&self) -> PoolStats {
        self.shared
            .counters
            .snapshot(self.shared.config.worker_count, self.shared.registry.len())
    }

    /// Spawn the workers, the dispatcher and the ambient watcher.
    ///
    /// Cancelling `ctx` closes submission, cancels every task still queued and
    /// cancels the context handed to running tasks.
    ///
    /// # Errors
    ///
    /// - `AlreadyStarted` if the scheduler is running
    /// - `PoolClosed` after `stop`
    /// - `SpawnFailed` if a thread or runtime could not be created; the
    ///   scheduler is then closed and queued tasks are cancelled
    pub fn start(&self, ctx: CancellationToken) -> Result<(), SchedulerError> {
        let mut lifecycle = self.lifecycle.lock();
        match *lifecycle {
            Lifecycle::Running(_) => return Err(SchedulerError::AlreadyStarted),
            Lifecycle::Stopped => return Err(SchedulerError::PoolClosed),
            Lifecycle::Idle => {}
        }
        let Some(submit_rx) = self.submit_rx.lock().take() else {
            return Err(SchedulerError::PoolClosed);
        };

        match self.spawn_threads(&submit_rx, ctx) {
            Ok(handles) => {
                *lifecycle = Lifecycle::Running(handles);
                info!(
                    worker_count = self.shared.config.worker_count,
                    "Scheduler started"
                );
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "Failed to start scheduler threads");
                self.shared.close_submissions();
                for entry in submit_rx.try_iter() {
                    self.shared.cancel_queued(&entry.id, STOPPED_REASON);
                }
                *lifecycle = Lifecycle::Stopped;
                Err(SchedulerError::SpawnFailed(err.to_string()))
            }
        }
    }

    /// Close submission, let the dispatcher flush and join every thread.
    ///
    /// In-flight and already-dispatched tasks finish first; a retry that
    /// arrives after the close fails with `PoolClosed`. Calling `stop` again
    /// is a no-op. Stopping a scheduler that never started cancels the tasks
    /// waiting on the submission queue.
    ///
    /// # Errors
    ///
    /// Currently infallible; the `Result` leaves room for join timeouts.
    pub fn stop(&self) -> Result<(), SchedulerError> {
        let mut lifecycle = self.lifecycle.lock();
        match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            Lifecycle::Stopped => Ok(()),
            Lifecycle::Idle => {
                self.shared.close_submissions();
                let mut cancelled = 0usize;
                if let Some(submit_rx) = self.submit_rx.lock().take() {
                    for entry in submit_rx.try_iter() {
                        self.shared.cancel_queued(&entry.id, STOPPED_REASON);
                        cancelled += 1;
                    }
                }
                info!(cancelled, "Scheduler stopped before start");
                Ok(())
            }
            Lifecycle::Running(handles) => {
                info!("Stopping scheduler");
                self.shared.close_submissions();
                handles.join(&self.shared);
                Ok(())
            }
        }
    }

    fn spawn_threads(
        &self,
        submit_rx: &Receiver<QueuedTask>,
        ctx: CancellationToken,
    ) -> std::io::Result<Handles> {
        let config = &self.shared.config;
        let (dispatch_tx, dispatch_rx) = bounded(config.dispatch_queue_capacity);
        // Never sent on; dropping the sender wakes every receiver.
        let (abort_tx, abort_rx) = bounded::<()>(0);
        let stopped = CancellationToken::new();

        let mut workers = Vec::with_capacity(config.worker_count);
        for id in 0..config.worker_count {
            let worker = Worker {
                id,
                shared: Arc::clone(&self.shared),
                dispatch_rx: dispatch_rx.clone(),
                abort_rx: abort_rx.clone(),
                ambient: ctx.clone(),
                runtime: build_runtime()?,
            };
            workers.push(worker.spawn()?);
        }

        let dispatcher = Dispatcher::new(
            Arc::clone(&self.shared),
            submit_rx.clone(),
            (dispatch_tx, dispatch_rx.clone()),
            abort_rx,
            ctx.clone(),
        )
        .spawn()?;

        let watcher = spawn_watcher(Arc::clone(&self.shared), ctx, stopped.clone(), abort_tx)?;

        Ok(Handles {
            dispatcher,
            workers,
            watcher,
            stopped,
            dispatch_rx,
        })
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        // Signal shutdown but don't join; `stop` is required for a graceful drain.
        self.shared.close_submissions();
        if let Lifecycle::Running(handles) = self.lifecycle.get_mut() {
            handles.stopped.cancel();
            debug!("TaskScheduler dropped without stop, threads detached");
        }
    }
}

fn build_runtime() -> std::io::Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

/// Waits for either the ambient token or a graceful stop, then releases the
/// abort signal.
fn spawn_watcher(
    shared: Arc<SchedulerShared>,
    ambient: CancellationToken,
    stopped: CancellationToken,
    abort_tx: Sender<()>,
) -> std::io::Result<JoinHandle<()>> {
    let runtime = build_runtime()?;
    let name = format!("{}-watch", shared.config.thread_name_prefix);
    thread::Builder::new().name(name).spawn(move || {
        let cancelled = runtime.block_on(async {
            tokio::select! {
                () = ambient.cancelled() => true,
                () = stopped.cancelled() => false,
            }
        });
        if cancelled {
            warn!("Ambient context cancelled, aborting scheduler");
            shared.close_submissions();
        }
        drop(abort_tx);
    })
}
