//! Worker threads.
//!
//! Each worker is a dedicated OS thread with its own single-threaded tokio
//! runtime. It blocks on the dispatch queue (no polling), runs one task at a
//! time under its timeout, and hands the outcome to the retry manager.
//!
//! A task's `execute` future is spawned onto the worker runtime so a panic
//! surfaces as a `JoinError` instead of unwinding through the worker.

use std::any::Any;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{select, Receiver};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::audit::AuditAction;
use super::retry;
use super::shared::SchedulerShared;
use super::stats::PoolCounters;
use super::{QueuedTask, SchedulerError, TaskRef};

const ABORTED_REASON: &str = "scheduler cancelled before execution";

pub(crate) struct Worker {
    pub id: usize,
    pub shared: Arc<SchedulerShared>,
    pub dispatch_rx: Receiver<QueuedTask>,
    pub abort_rx: Receiver<()>,
    pub ambient: CancellationToken,
    pub runtime: Runtime,
}

impl Worker {
    /// Spawn the worker thread.
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        let name = format!("{}-{}", self.shared.config.thread_name_prefix, self.id);
        thread::Builder::new()
            .name(name)
            .stack_size(self.shared.config.thread_stack_size)
            .spawn(move || self.run())
    }

    fn run(self) {
        debug!(worker_id = self.id, "Worker thread started");

        loop {
            let next = select! {
                recv(self.dispatch_rx) -> msg => msg.ok(),
                recv(self.abort_rx) -> _ => None,
            };

            let Some(entry) = next else {
                break;
            };

            if self.ambient.is_cancelled() {
                self.shared.cancel_queued(&entry.id, ABORTED_REASON);
                continue;
            }

            self.run_one(&entry);
        }

        // Non-empty only when leaving through the abort signal.
        for entry in self.dispatch_rx.try_iter() {
            self.shared.cancel_queued(&entry.id, ABORTED_REASON);
        }

        debug!(worker_id = self.id, "Worker thread exiting");
    }

    fn run_one(&self, entry: &QueuedTask) {
        let (task, timeout) = match self.shared.registry.begin_run(&entry.id) {
            Ok(run) => run,
            Err(err) => {
                debug!(
                    worker_id = self.id,
                    task_id = %entry.id,
                    reason = err.as_label(),
                    "Skipping task that is no longer pending"
                );
                return;
            }
        };

        PoolCounters::incr(&self.shared.counters.active_tasks);
        self.shared.audit(
            &entry.id,
            AuditAction::Start,
            Some(format!("worker={}", self.id)),
        );
        debug!(
            worker_id = self.id,
            task_id = %entry.id,
            task_name = task.name(),
            priority = entry.priority,
            "Worker executing task"
        );

        let started = Instant::now();
        let ctx = self.ambient.child_token();
        let outcome = self.runtime.block_on(execute(task, timeout, ctx));
        let elapsed = started.elapsed();

        PoolCounters::decr(&self.shared.counters.active_tasks);
        if let Err(err) = &outcome {
            info!(
                worker_id = self.id,
                task_id = %entry.id,
                error = %err,
                elapsed_ms = elapsed.as_millis(),
                "Task execution failed"
            );
        }
        retry::settle(&self.shared, &entry.id, outcome, elapsed);
    }
}

/// Run one task to completion, timeout, or panic.
async fn execute(
    task: TaskRef,
    timeout: Duration,
    ctx: CancellationToken,
) -> Result<(), SchedulerError> {
    let task_ctx = ctx.clone();
    let mut handle = tokio::spawn(async move { task.execute(task_ctx).await });

    let joined = if timeout.is_zero() {
        (&mut handle).await
    } else if let Ok(joined) = tokio::time::timeout(timeout, &mut handle).await {
        joined
    } else {
        ctx.cancel();
        handle.abort();
        return Err(SchedulerError::DeadlineExceeded(timeout));
    };

    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(SchedulerError::ExecutionError(format!("{err:#}"))),
        Err(join_err) if join_err.is_panic() => Err(SchedulerError::ExecutionError(format!(
            "task panicked: {}",
            panic_message(join_err.into_panic().as_ref())
        ))),
        Err(join_err) => Err(SchedulerError::ExecutionError(format!(
            "task aborted: {join_err}"
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
