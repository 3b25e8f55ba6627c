//! Dispatcher: the single priority flush loop between the two queues.
//!
//! Every tick the dispatcher drains the submission queue into a
//! [`PriorityBatch`], then forwards entries to the dispatch queue in
//! `(priority desc, seq asc)` order. Entries that do not fit are held for the
//! next tick, never dropped. Once the submission queue is closed and empty it
//! performs a final blocking flush and exits, which closes the dispatch queue
//! and lets the workers drain and stop.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{select, tick, Receiver, Sender, TryRecvError, TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::infra::queue::PriorityBatch;

use super::shared::SchedulerShared;
use super::stats::PoolCounters;
use super::{QueuedTask, SchedulerError, TaskId, TaskStatus};

const CANCELLED_REASON: &str = "scheduler cancelled before dispatch";

pub(crate) struct Dispatcher {
    shared: Arc<SchedulerShared>,
    submit_rx: Receiver<QueuedTask>,
    dispatch_tx: Sender<QueuedTask>,
    /// Only read by `abandon`, to sweep entries no worker will pick up.
    dispatch_rx: Receiver<QueuedTask>,
    abort_rx: Receiver<()>,
    ambient: CancellationToken,
    held: PriorityBatch,
}

impl Dispatcher {
    pub fn new(
        shared: Arc<SchedulerShared>,
        submit_rx: Receiver<QueuedTask>,
        (dispatch_tx, dispatch_rx): (Sender<QueuedTask>, Receiver<QueuedTask>),
        abort_rx: Receiver<()>,
        ambient: CancellationToken,
    ) -> Self {
        let capacity = shared.config.submission_queue_capacity;
        Self {
            shared,
            submit_rx,
            dispatch_tx,
            dispatch_rx,
            abort_rx,
            ambient,
            held: PriorityBatch::with_capacity(capacity),
        }
    }

    /// Spawn the dispatcher on its own thread.
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        let name = format!("{}-dispatch", self.shared.config.thread_name_prefix);
        thread::Builder::new().name(name).spawn(move || self.run())
    }

    fn run(mut self) {
        let ticker = tick(self.shared.config.tick_interval());
        debug!(
            tick_ms = self.shared.config.tick_interval_ms,
            "Dispatcher started"
        );

        loop {
            let aborted = select! {
                recv(ticker) -> _ => false,
                recv(self.abort_rx) -> _ => true,
            };

            if aborted || self.ambient.is_cancelled() {
                self.abandon();
                return;
            }

            let closed = self.drain();
            self.flush();

            if closed {
                self.final_flush();
                info!("Dispatcher stopped");
                return;
            }
        }
    }

    /// Move everything currently on the submission queue into the batch.
    /// Returns `true` once the queue is closed and empty.
    fn drain(&mut self) -> bool {
        loop {
            match self.submit_rx.try_recv() {
                Ok(entry) => self.held.push(entry),
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Disconnected) => return true,
            }
        }
    }

    /// One flush window: non-blocking forward in priority order.
    fn flush(&mut self) {
        if self.held.is_empty() {
            return;
        }

        let mut saturated = false;
        let mut carry = Vec::new();

        while let Some(entry) = self.held.pop() {
            if !self.is_dispatchable(&entry) {
                continue;
            }
            if saturated {
                self.hold(entry, &mut carry);
                continue;
            }
            let id = entry.id.clone();
            match self.dispatch_tx.try_send(entry) {
                Ok(()) => self.dispatched(&id),
                Err(TrySendError::Full(entry)) => {
                    saturated = true;
                    self.hold(entry, &mut carry);
                }
                Err(TrySendError::Disconnected(entry)) => {
                    self.shared.fail_record(&entry.id, SchedulerError::PoolClosed);
                }
            }
        }

        if !carry.is_empty() {
            warn!(
                held = carry.len(),
                capacity = self.shared.config.dispatch_queue_capacity,
                "Dispatch queue full, holding tasks for next tick"
            );
        }
        self.held.extend(carry);
    }

    /// Record one more held cycle, failing the entry once it exceeds the
    /// configured wait.
    fn hold(&self, mut entry: QueuedTask, carry: &mut Vec<QueuedTask>) {
        entry.held_cycles += 1;
        match self.shared.config.max_dispatch_wait_cycles {
            Some(max) if entry.held_cycles > max => {
                let cycles = entry.held_cycles;
                self.shared
                    .fail_record(&entry.id, SchedulerError::DispatchTimeout { cycles });
            }
            _ => carry.push(entry),
        }
    }

    /// Shutdown flush: blocking forward of everything left, while workers drain.
    fn final_flush(&mut self) {
        let mut remaining = self.held.drain_ordered().into_iter();
        while let Some(entry) = remaining.next() {
            if !self.is_dispatchable(&entry) {
                continue;
            }
            let id = entry.id.clone();
            let sent = select! {
                send(self.dispatch_tx, entry) -> res => Some(res.is_ok()),
                recv(self.abort_rx) -> _ => None,
            };
            match sent {
                Some(true) => self.dispatched(&id),
                Some(false) => self.shared.fail_record(&id, SchedulerError::PoolClosed),
                None => {
                    self.shared.cancel_queued(&id, CANCELLED_REASON);
                    self.held.extend(remaining);
                    self.abandon();
                    return;
                }
            }
        }
    }

    /// Ambient cancellation: nothing held, queued for submission, or already
    /// dispatched will run. Workers stop reading once aborted, so entries sent
    /// after their last sweep are cancelled here.
    fn abandon(&mut self) {
        self.shared.close_submissions();
        let mut cancelled = 0usize;
        for entry in self.held.drain_ordered() {
            self.shared.cancel_queued(&entry.id, CANCELLED_REASON);
            cancelled += 1;
        }
        for entry in self.submit_rx.try_iter() {
            self.shared.cancel_queued(&entry.id, CANCELLED_REASON);
            cancelled += 1;
        }
        for entry in self.dispatch_rx.try_iter() {
            self.shared.cancel_queued(&entry.id, CANCELLED_REASON);
            cancelled += 1;
        }
        info!(cancelled, "Dispatcher cancelled");
    }

    fn is_dispatchable(&self, entry: &QueuedTask) -> bool {
        match self.shared.registry.status(&entry.id) {
            Some(TaskStatus::Pending) => true,
            status => {
                debug!(task_id = %entry.id, ?status, "Skipping non-pending task");
                false
            }
        }
    }

    fn dispatched(&self, id: &TaskId) {
        PoolCounters::incr(&self.shared.counters.dispatched_tasks);
        debug!(task_id = %id, "Task dispatched");
    }
}
