//! Prometheus metrics for workflow observability

use crate::error::Result;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Workflow metrics on their own registry
pub struct WorkflowMetrics {
    registry: Registry,

    /// Operations by kind, operation and outcome
    operations: IntCounterVec,

    /// Operation latency by kind and operation
    duration: HistogramVec,

    /// Notifications that exhausted their retries
    notifications_failed: IntCounter,
}

impl WorkflowMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new_custom(Some("cofund".to_string()), None)?;

        let operations = IntCounterVec::new(
            Opts::new("transitions_total", "Workflow operations by outcome"),
            &["kind", "operation", "outcome"],
        )?;
        let duration = HistogramVec::new(
            HistogramOpts::new(
                "transition_duration_seconds",
                "Workflow operation latency",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
            &["kind", "operation"],
        )?;
        let notifications_failed = IntCounter::new(
            "notifications_failed_total",
            "Notifications dropped after the last retry",
        )?;

        registry.register(Box::new(operations.clone()))?;
        registry.register(Box::new(duration.clone()))?;
        registry.register(Box::new(notifications_failed.clone()))?;

        Ok(Self {
            registry,
            operations,
            duration,
            notifications_failed,
        })
    }

    pub fn record_operation(&self, kind: &str, operation: &str, outcome: &str, elapsed: Duration) {
        self.operations
            .with_label_values(&[kind, operation, outcome])
            .inc();
        self.duration
            .with_label_values(&[kind, operation])
            .observe(elapsed.as_secs_f64());
    }

    pub fn record_notification_failure(&self) {
        self.notifications_failed.inc();
    }

    pub fn operations_total(&self, kind: &str, operation: &str, outcome: &str) -> u64 {
        self.operations
            .with_label_values(&[kind, operation, outcome])
            .get()
    }

    pub fn notifications_failed(&self) -> u64 {
        self.notifications_failed.get()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Text exposition format
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| crate::error::WorkflowError::Internal(format!("metrics output: {}", e)))
    }
}
