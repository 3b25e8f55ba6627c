//! Scheduler configuration.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Prefix of the environment variables read by [`SchedulerConfig::from_env`].
pub const ENV_PREFIX: &str = "TASK_SCHEDULER_";

const DEFAULT_QUEUE_CAPACITY: usize = 100;
const DEFAULT_TICK_INTERVAL_MS: u64 = 100;
const DEFAULT_STACK_SIZE: usize = 2 * 1024 * 1024;

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Number of worker threads (at least 1).
    pub worker_count: usize,
    /// Capacity of the submission queue.
    pub submission_queue_capacity: usize,
    /// Capacity of the dispatch queue.
    pub dispatch_queue_capacity: usize,
    /// Dispatcher flush interval in milliseconds.
    pub tick_interval_ms: u64,
    /// Flush cycles a record may be held back by a full dispatch queue before
    /// it fails with `DispatchTimeout`. `None` holds it indefinitely.
    pub max_dispatch_wait_cycles: Option<u32>,
    /// Stack size for worker threads, in bytes.
    pub thread_stack_size: usize,
    /// Thread name prefix; workers are named `<prefix>-<n>`.
    pub thread_name_prefix: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get().max(1),
            submission_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            dispatch_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            max_dispatch_wait_cycles: None,
            thread_stack_size: DEFAULT_STACK_SIZE,
            thread_name_prefix: "ts-worker".into(),
        }
    }
}

impl SchedulerConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of worker threads.
    #[must_use]
    pub const fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Set the submission queue capacity.
    #[must_use]
    pub const fn with_submission_queue_capacity(mut self, capacity: usize) -> Self {
        self.submission_queue_capacity = capacity;
        self
    }

    /// Set the dispatch queue capacity.
    #[must_use]
    pub const fn with_dispatch_queue_capacity(mut self, capacity: usize) -> Self {
        self.dispatch_queue_capacity = capacity;
        self
    }

    /// Set the dispatcher flush interval.
    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Fail records held back for more than `cycles` flush cycles.
    #[must_use]
    pub const fn with_max_dispatch_wait_cycles(mut self, cycles: u32) -> Self {
        self.max_dispatch_wait_cycles = Some(cycles);
        self
    }

    /// Set the worker thread stack size.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, bytes: usize) -> Self {
        self.thread_stack_size = bytes;
        self
    }

    /// Set the thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Dispatcher flush interval.
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count == 0 {
            return Err("worker_count must be greater than 0".into());
        }
        if self.submission_queue_capacity == 0 {
            return Err("submission_queue_capacity must be greater than 0".into());
        }
        if self.dispatch_queue_capacity == 0 {
            return Err("dispatch_queue_capacity must be greater than 0".into());
        }
        if self.tick_interval_ms == 0 {
            return Err("tick_interval_ms must be greater than 0".into());
        }
        if self.thread_stack_size < 64 * 1024 {
            return Err("thread_stack_size must be at least 64 KiB".into());
        }
        if self.thread_name_prefix.is_empty() {
            return Err("thread_name_prefix must not be empty".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from `TASK_SCHEDULER_*` environment variables,
    /// loading a `.env` file first when one is present.
    ///
    /// # Errors
    ///
    /// Returns a message naming the variable that failed to parse, or a validation message.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from a key lookup (keys include [`ENV_PREFIX`]).
    ///
    /// # Errors
    ///
    /// Same as [`SchedulerConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut cfg = Self::default();
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(v) = var("WORKER_COUNT") {
            cfg.worker_count = parse("WORKER_COUNT", &v)?;
        }
        if let Some(v) = var("SUBMISSION_QUEUE_CAPACITY") {
            cfg.submission_queue_capacity = parse("SUBMISSION_QUEUE_CAPACITY", &v)?;
        }
        if let Some(v) = var("DISPATCH_QUEUE_CAPACITY") {
            cfg.dispatch_queue_capacity = parse("DISPATCH_QUEUE_CAPACITY", &v)?;
        }
        if let Some(v) = var("TICK_INTERVAL_MS") {
            cfg.tick_interval_ms = parse("TICK_INTERVAL_MS", &v)?;
        }
        if let Some(v) = var("MAX_DISPATCH_WAIT_CYCLES") {
            cfg.max_dispatch_wait_cycles = Some(parse("MAX_DISPATCH_WAIT_CYCLES", &v)?);
        }
        if let Some(v) = var("THREAD_STACK_SIZE") {
            cfg.thread_stack_size = parse("THREAD_STACK_SIZE", &v)?;
        }
        if let Some(v) = var("THREAD_NAME_PREFIX") {
            cfg.thread_name_prefix = v;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse<T>(name: &str, value: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| format!("{ENV_PREFIX}{name}={value:?}: {e}"))
}
