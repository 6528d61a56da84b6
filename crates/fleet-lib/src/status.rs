//! Server status classification
//!
//! The evolver and the factory's status refresh both classify through this
//! single threshold table.

use crate::models::{ServerMetrics, ServerStatus};

/// Thresholds separating healthy, warning and critical servers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusThresholds {
    pub cpu_critical: f64,
    pub memory_critical: f64,
    pub duration_critical_secs: f64,
    pub cpu_warning: f64,
    pub memory_warning: f64,
    pub duration_warning_secs: f64,
}

pub const STATUS_THRESHOLDS: StatusThresholds = StatusThresholds {
    cpu_critical: 90.0,
    memory_critical: 95.0,
    duration_critical_secs: 5.0,
    cpu_warning: 75.0,
    memory_warning: 85.0,
    duration_warning_secs: 2.0,
};

impl StatusThresholds {
    pub fn classify(&self, metrics: &ServerMetrics) -> ServerStatus {
        if !metrics.is_finite() {
            return ServerStatus::Unknown;
        }

        let cpu = metrics.cpu_percent;
        let memory = metrics.memory_percent;
        let duration = metrics.http_request_duration_secs;

        if cpu > self.cpu_critical
            || memory > self.memory_critical
            || duration > self.duration_critical_secs
        {
            ServerStatus::Critical
        } else if cpu > self.cpu_warning
            || memory > self.memory_warning
            || duration > self.duration_warning_secs
        {
            ServerStatus::Warning
        } else {
            ServerStatus::Healthy
        }
    }
}

/// Classify metrics against the shared threshold table
pub fn classify(metrics: &ServerMetrics) -> ServerStatus {
    STATUS_THRESHOLDS.classify(metrics)
}
