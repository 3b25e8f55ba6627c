//! # Prometheus Task Scheduler
//!
//! An in-process priority task scheduler backed by dedicated OS threads.
//!
//! Callers submit tasks (a name, a priority, an optional timeout and a retry
//! budget); a single dispatcher batches them every tick and forwards them to a
//! fixed pool of workers in priority order. Every task's lifecycle is tracked
//! in a registry that can be queried at any time.
//!
//! ## Pipeline
//!
//! ```text
//! submit ──► submission queue ──► dispatcher (tick) ──► dispatch queue ──► workers
//!   │          (bounded)           priority batch         (bounded)          │
//!   └────────────────────────────── registry ◄──────── retry manager ◄──────┘
//! ```
//!
//! - **Priority flush**: within one tick, higher priority first; equal
//!   priorities in submission order
//! - **Backpressure**: a full submission queue rejects with `QueueFull`; a
//!   full dispatch queue holds tasks for the next tick
//! - **Retries**: failed tasks are resubmitted until their budget is spent
//! - **Cancellation**: pending tasks can be cancelled; an ambient
//!   `CancellationToken` aborts the whole scheduler
//! - **Timeouts and panics**: enforced per task and recorded as failures
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::time::Duration;
//!
//! use prometheus_task_scheduler::config::SchedulerConfig;
//! use prometheus_task_scheduler::core::{TaskFn, TaskScheduler, TaskStatus};
//! use tokio_util::sync::CancellationToken;
//!
//! prometheus_task_scheduler::util::init_tracing();
//!
//! let scheduler = TaskScheduler::new(SchedulerConfig::new().with_worker_count(4))?;
//! scheduler.start(CancellationToken::new())?;
//!
//! let id = scheduler.submit(
//!     TaskFn::new("rebuild-index", |ctx| async move {
//!         tokio::select! {
//!             () = ctx.cancelled() => Ok(()),
//!             () = tokio::time::sleep(Duration::from_millis(50)) => Ok(()),
//!         }
//!     })
//!     .with_priority(10)
//!     .with_timeout(Duration::from_secs(5))
//!     .with_retry_budget(2),
//! )?;
//!
//! scheduler.stop()?;
//! assert_eq!(scheduler.get_info(&id).map(|r| r.status), Some(TaskStatus::Completed));
//! ```
//!
//! For complete examples, see `tests/scheduler_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions: tasks, records, registry and the scheduler.
pub mod core;
/// Configuration models for the scheduler.
pub mod config;
/// Builders to construct schedulers from configuration.
pub mod builders;
/// Infrastructure adapters for queues.
pub mod infra;
/// Shared utilities.
pub mod util;
