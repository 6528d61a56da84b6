//! Observability infrastructure for the fleet simulator
//!
//! Provides:
//! - Prometheus metrics (job latency, fleet size and status, scaling, scores)
//! - Structured logging of simulator events with tracing

use crate::autoscaler::ScaleAction;
use crate::models::{ServerStatus, StatusCounts};
use prometheus::{
    register_gauge, register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge, register_int_gauge_vec, Gauge, HistogramVec, IntCounter, IntCounterVec,
    IntGauge, IntGaugeVec,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Histogram buckets for job latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<FleetMetricsInner> = OnceLock::new();

struct FleetMetricsInner {
    job_duration_seconds: HistogramVec,
    job_errors: IntCounterVec,
    fleet_size: IntGauge,
    servers_by_status: IntGaugeVec,
    scaling_decisions: IntCounterVec,
    analysis_runs: IntCounter,
    system_score: Gauge,
    health_score: Gauge,
    efficiency_score: Gauge,
}

impl FleetMetricsInner {
    fn new() -> Self {
        Self {
            job_duration_seconds: register_histogram_vec!(
                "fleet_job_duration_seconds",
                "Time spent in one invocation of a scheduler job",
                &["job"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register fleet_job_duration_seconds"),

            job_errors: register_int_counter_vec!(
                "fleet_job_errors_total",
                "Total number of failed scheduler job invocations",
                &["job"]
            )
            .expect("Failed to register fleet_job_errors_total"),

            fleet_size: register_int_gauge!(
                "fleet_servers",
                "Number of simulated servers in the fleet"
            )
            .expect("Failed to register fleet_servers"),

            servers_by_status: register_int_gauge_vec!(
                "fleet_servers_by_status",
                "Number of simulated servers per health status",
                &["status"]
            )
            .expect("Failed to register fleet_servers_by_status"),

            scaling_decisions: register_int_counter_vec!(
                "fleet_scaling_decisions_total",
                "Total number of autoscaler decisions by action",
                &["action"]
            )
            .expect("Failed to register fleet_scaling_decisions_total"),

            analysis_runs: register_int_counter!(
                "fleet_analysis_runs_total",
                "Total number of completed fleet analysis passes"
            )
            .expect("Failed to register fleet_analysis_runs_total"),

            system_score: register_gauge!(
                "fleet_system_score",
                "Simulator performance score (0-100)"
            )
            .expect("Failed to register fleet_system_score"),

            health_score: register_gauge!(
                "fleet_health_score",
                "Share of non-critical servers (0-100)"
            )
            .expect("Failed to register fleet_health_score"),

            efficiency_score: register_gauge!(
                "fleet_efficiency_score",
                "Weighted fleet efficiency (0-100)"
            )
            .expect("Failed to register fleet_efficiency_score"),
        }
    }
}

/// Fleet metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the same
/// underlying metrics.
#[derive(Clone)]
pub struct FleetMetrics {
    _private: (),
}

impl Default for FleetMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl FleetMetrics {
    /// Create a metrics handle, registering the global metrics on first use
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(FleetMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &FleetMetricsInner {
        GLOBAL_METRICS.get_or_init(FleetMetricsInner::new)
    }

    pub fn observe_job_duration(&self, job: &str, duration_secs: f64) {
        self.inner()
            .job_duration_seconds
            .with_label_values(&[job])
            .observe(duration_secs);
    }

    pub fn inc_job_errors(&self, job: &str) {
        self.inner().job_errors.with_label_values(&[job]).inc();
    }

    /// Publish fleet size and the per-status breakdown
    pub fn set_fleet(&self, counts: &StatusCounts) {
        let inner = self.inner();
        inner.fleet_size.set(counts.total() as i64);
        for (status, count) in [
            (ServerStatus::Healthy, counts.healthy),
            (ServerStatus::Warning, counts.warning),
            (ServerStatus::Critical, counts.critical),
            (ServerStatus::Unknown, counts.unknown),
        ] {
            inner
                .servers_by_status
                .with_label_values(&[&status.to_string()])
                .set(count as i64);
        }
    }

    pub fn inc_scaling_decision(&self, action: ScaleAction) {
        self.inner()
            .scaling_decisions
            .with_label_values(&[action.as_str()])
            .inc();
    }

    pub fn inc_analysis_runs(&self) {
        self.inner().analysis_runs.inc();
    }

    pub fn set_system_score(&self, score: f64) {
        self.inner().system_score.set(score);
    }

    pub fn set_health_score(&self, score: f64) {
        self.inner().health_score.set(score);
    }

    pub fn set_efficiency_score(&self, score: f64) {
        self.inner().efficiency_score.set(score);
    }
}

/// Structured logger for simulator events
#[derive(Clone)]
pub struct StructuredLogger {
    node_name: String,
}

impl StructuredLogger {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
        }
    }

    pub fn log_startup(&self, version: &str, servers: usize, profile: &str) {
        info!(
            event = "simulator_started",
            node = %self.node_name,
            version = %version,
            servers = servers,
            profile = %profile,
            "Fleet simulator started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "simulator_shutdown",
            node = %self.node_name,
            reason = %reason,
            "Fleet simulator shutting down"
        );
    }

    pub fn log_scaling_applied(
        &self,
        action: ScaleAction,
        from_count: usize,
        to_count: usize,
        avg_cpu: f64,
        server_id: Option<&str>,
    ) {
        info!(
            event = "scaling_applied",
            node = %self.node_name,
            action = %action,
            from_count = from_count,
            to_count = to_count,
            avg_cpu = avg_cpu,
            server_id = ?server_id,
            "Applied scaling decision"
        );
    }

    /// Log a server status transition; transitions into critical are warnings
    pub fn log_status_changed(&self, server_id: &str, from: ServerStatus, to: ServerStatus) {
        if to == ServerStatus::Critical {
            warn!(
                event = "status_changed",
                node = %self.node_name,
                server_id = %server_id,
                from = %from,
                to = %to,
                "Server became critical"
            );
        } else {
            info!(
                event = "status_changed",
                node = %self.node_name,
                server_id = %server_id,
                from = %from,
                to = %to,
                "Server status changed"
            );
        }
    }

    pub fn log_job_failed(&self, job: &str, error: &str, error_count: u64) {
        error!(
            event = "job_failed",
            node = %self.node_name,
            job = %job,
            error = %error,
            error_count = error_count,
            "Scheduler job failed"
        );
    }

    pub fn log_intervals_retuned(
        &self,
        generation_secs: u64,
        analysis_secs: u64,
        autoscaling_secs: u64,
        performance_secs: u64,
    ) {
        info!(
            event = "intervals_retuned",
            node = %self.node_name,
            generation_secs = generation_secs,
            analysis_secs = analysis_secs,
            autoscaling_secs = autoscaling_secs,
            performance_secs = performance_secs,
            "Job intervals adjusted to observed load"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fleet_metrics_recording() {
        let metrics = FleetMetrics::new();
        let other = FleetMetrics::new();

        metrics.observe_job_duration("generation", 0.002);
        metrics.inc_job_errors("generation");
        other.inc_job_errors("generation");
        metrics.set_fleet(&StatusCounts {
            healthy: 3,
            warning: 1,
            critical: 1,
            unknown: 0,
        });
        metrics.inc_scaling_decision(ScaleAction::ScaleOut);
        metrics.inc_analysis_runs();
        metrics.set_system_score(85.0);

        // The registry is process-wide, other tests may have added errors too
        let inner = metrics.inner();
        assert!(inner.job_errors.with_label_values(&["generation"]).get() >= 2);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-node");
        assert_eq!(logger.node_name, "test-node");
    }
}
