//! Tests for configuration validation and loading

use std::time::Duration;

use prometheus_task_scheduler::config::SchedulerConfig;

#[test]
fn test_scheduler_config_defaults() {
    let config = SchedulerConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.submission_queue_capacity, 100);
    assert_eq!(config.dispatch_queue_capacity, 100);
    assert_eq!(config.tick_interval_ms, 100);
    assert_eq!(config.thread_stack_size, 2 * 1024 * 1024);
    assert_eq!(config.thread_name_prefix, "ts-worker");
}

#[test]
fn test_scheduler_config_builders() {
    let config = SchedulerConfig::new()
        .with_worker_count(4)
        .with_submission_queue_capacity(500)
        .with_dispatch_queue_capacity(50)
        .with_tick_interval(Duration::from_millis(25))
        .with_max_dispatch_wait_cycles(8)
        .with_thread_stack_size(4 * 1024 * 1024)
        .with_thread_name_prefix("inference");

    assert!(config.validate().is_ok());
    assert_eq!(config.worker_count, 4);
    assert_eq!(config.submission_queue_capacity, 500);
    assert_eq!(config.dispatch_queue_capacity, 50);
    assert_eq!(config.tick_interval(), Duration::from_millis(25));
    assert_eq!(config.max_dispatch_wait_cycles, Some(8));
    assert_eq!(config.thread_name_prefix, "inference");
}

#[test]
fn test_scheduler_config_invalid_worker_count() {
    let invalid = SchedulerConfig::new().with_worker_count(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_scheduler_config_invalid_queue_capacities() {
    assert!(SchedulerConfig::new()
        .with_submission_queue_capacity(0)
        .validate()
        .is_err());
    assert!(SchedulerConfig::new()
        .with_dispatch_queue_capacity(0)
        .validate()
        .is_err());
}

#[test]
fn test_scheduler_config_invalid_stack_size() {
    let invalid = SchedulerConfig::new().with_thread_stack_size(1024);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_scheduler_config_from_json() {
    let config = SchedulerConfig::from_json_str(
        r#"{"worker_count": 2, "tick_interval_ms": 50, "max_dispatch_wait_cycles": 4}"#,
    )
    .unwrap();
    assert_eq!(config.worker_count, 2);
    assert_eq!(config.tick_interval_ms, 50);
    assert_eq!(config.max_dispatch_wait_cycles, Some(4));
    // Missing fields keep their defaults.
    assert_eq!(config.dispatch_queue_capacity, 100);
}

#[test]
fn test_scheduler_config_from_json_rejects_invalid() {
    assert!(SchedulerConfig::from_json_str(r#"{"worker_count": 0}"#).is_err());
    assert!(SchedulerConfig::from_json_str("not json").is_err());
}

#[test]
fn test_scheduler_config_serde_roundtrip() {
    let config = SchedulerConfig::new().with_worker_count(3);
    let json = serde_json::to_string(&config).unwrap();
    let parsed = SchedulerConfig::from_json_str(&json).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_scheduler_config_from_lookup_validates() {
    let result = SchedulerConfig::from_lookup(|key| {
        (key == "TASK_SCHEDULER_DISPATCH_QUEUE_CAPACITY").then(|| "0".to_string())
    });
    assert!(result.is_err());
}
