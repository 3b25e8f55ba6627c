//! Builder to construct a [`TaskScheduler`] from configuration.

use std::fmt;
use std::sync::Arc;

use crate::config::SchedulerConfig;
use crate::core::{AuditSink, IdGenerator, SchedulerError, TaskScheduler, UuidIdGenerator};

/// Assembles a scheduler from configuration, an identifier generator and an
/// optional audit sink.
///
/// ```rust,ignore
/// let audit = Arc::new(InMemoryAuditSink::new(1_000));
/// let scheduler = SchedulerBuilder::new(SchedulerConfig::from_env()?)
///     .with_id_generator(Arc::new(SequentialIdGenerator::new("job")))
///     .with_audit(audit.clone())
///     .build()?;
/// ```
pub struct SchedulerBuilder {
    config: SchedulerConfig,
    ids: Arc<dyn IdGenerator>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl SchedulerBuilder {
    /// Start from `config`, UUID identifiers and no audit sink.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            ids: Arc::new(UuidIdGenerator),
            audit: None,
        }
    }

    /// Use a custom identifier generator.
    #[must_use]
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Report lifecycle events to `sink`.
    #[must_use]
    pub fn with_audit(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    /// Validate the configuration and create the scheduler. No threads are
    /// spawned until [`TaskScheduler::start`].
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidConfig` if validation fails.
    pub fn build(self) -> Result<TaskScheduler, SchedulerError> {
        self.config.validate().map_err(SchedulerError::InvalidConfig)?;
        Ok(TaskScheduler::from_parts(self.config, self.ids, self.audit))
    }
}

impl fmt::Debug for SchedulerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerBuilder")
            .field("config", &self.config)
            .field("audit", &self.audit.is_some())
            .finish_non_exhaustive()
    }
}
