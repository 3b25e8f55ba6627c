//! Task contract and a closure-backed implementation.

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::AppResult;

/// A unit of work accepted by the scheduler.
///
/// `priority`, `timeout` and `retry_budget` are read once at submission and
/// treated as fixed for the lifetime of the task.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use prometheus_task_scheduler::core::{AppResult, Task};
/// use tokio_util::sync::CancellationToken;
///
/// struct Reindex;
///
/// #[async_trait]
/// impl Task for Reindex {
///     fn name(&self) -> &str { "reindex" }
///     fn priority(&self) -> i32 { 10 }
///
///     async fn execute(&self, ctx: CancellationToken) -> AppResult<()> {
///         if ctx.is_cancelled() {
///             return Ok(());
///         }
///         // do work...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Human-readable task name, used in logs and records.
    fn name(&self) -> &str;

    /// Scheduling priority; higher values are dispatched sooner.
    fn priority(&self) -> i32 {
        0
    }

    /// Execution timeout. `Duration::ZERO` means unbounded.
    fn timeout(&self) -> Duration {
        Duration::ZERO
    }

    /// Maximum number of re-executions after the first failure.
    fn retry_budget(&self) -> u32 {
        0
    }

    /// Run the work.
    ///
    /// `ctx` is cancelled when the scheduler's ambient token is cancelled or
    /// the task's timeout fires. Long-running work should check it.
    async fn execute(&self, ctx: CancellationToken) -> AppResult<()>;
}

/// Shared handle to a task object.
pub type TaskRef = Arc<dyn Task>;

/// Closure-backed task with builder-style scheduling options.
///
/// Each execution calls the closure again, producing a fresh future.
///
/// ```rust,ignore
/// let task = TaskFn::new("process-data", |_ctx| async { Ok(()) })
///     .with_priority(10)
///     .with_timeout(Duration::from_secs(30))
///     .with_retry_budget(3);
/// let id = scheduler.submit(task)?;
/// ```
pub struct TaskFn<F> {
    name: Cow<'static, str>,
    priority: i32,
    timeout: Duration,
    retry_budget: u32,
    f: F,
}

impl<F, Fut> TaskFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<()>> + Send + 'static,
{
    /// Create a task with priority 0, no timeout and no retries.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            priority: 0,
            timeout: Duration::ZERO,
            retry_budget: 0,
            f,
        }
    }

    /// Set the scheduling priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the execution timeout (`Duration::ZERO` disables it).
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of re-executions allowed after the first failure.
    #[must_use]
    pub const fn with_retry_budget(mut self, retry_budget: u32) -> Self {
        self.retry_budget = retry_budget;
        self
    }
}

impl<F> fmt::Debug for TaskFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskFn")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("timeout", &self.timeout)
            .field("retry_budget", &self.retry_budget)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> Task for TaskFn<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<()>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn retry_budget(&self) -> u32 {
        self.retry_budget
    }

    async fn execute(&self, ctx: CancellationToken) -> AppResult<()> {
        (self.f)(ctx).await
    }
}
