//! Core scheduling abstractions: records, registry, dispatcher, workers.

pub mod audit;
mod dispatcher;
pub mod error;
pub mod id;
pub mod record;
pub mod registry;
mod retry;
pub mod scheduler;
mod shared;
pub mod stats;
pub mod task;
mod worker;

pub use audit::{AuditAction, AuditEvent, AuditSink, InMemoryAuditSink, build_audit_event};
pub use error::{AppResult, SchedulerError};
pub use id::{IdGenerator, SequentialIdGenerator, TaskId, UuidIdGenerator};
pub use record::{QueuedTask, TaskRecord, TaskStatus};
pub use registry::{FailureOutcome, TaskRegistry};
pub use scheduler::TaskScheduler;
pub use stats::PoolStats;
pub use task::{Task, TaskFn, TaskRef};
