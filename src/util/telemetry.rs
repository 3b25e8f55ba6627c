//! Tracing setup for applications and tests embedding the scheduler.

use tracing_subscriber::EnvFilter;

/// Filter applied when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "prometheus_task_scheduler=info";

/// Install a fmt subscriber unless the host application already set one.
///
/// The filter comes from `RUST_LOG` (for example
/// `RUST_LOG=prometheus_task_scheduler=debug`), falling back to
/// [`DEFAULT_FILTER`]. Thread names are printed so dispatcher (`<prefix>-dispatch`)
/// and worker (`<prefix>-<n>`) output can be told apart.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_target(false)
        .try_init();
}
