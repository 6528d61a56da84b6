//! Simulator self-monitoring counters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Running counters maintained by the scheduler's jobs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceCounters {
    /// Completed generation ticks
    pub ticks: u64,
    /// Running mean of tick processing time in milliseconds
    pub avg_processing_ms: f64,
    /// Failed job invocations of any kind
    pub error_count: u64,
    pub analysis_runs: u64,
    pub scaling_decisions: u64,
    pub last_tick_at: Option<DateTime<Utc>>,
}

impl PerformanceCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one tick duration into the running mean
    pub fn record_tick(&mut self, elapsed: Duration) {
        let ms = elapsed.as_secs_f64() * 1000.0;
        self.ticks += 1;
        self.avg_processing_ms += (ms - self.avg_processing_ms) / self.ticks as f64;
        self.last_tick_at = Some(Utc::now());
    }

    pub fn record_error(&mut self) {
        self.error_count += 1;
    }

    pub fn record_analysis(&mut self) {
        self.analysis_runs += 1;
    }

    pub fn record_scaling_decision(&mut self) {
        self.scaling_decisions += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_mean() {
        let mut counters = PerformanceCounters::new();
        counters.record_tick(Duration::from_millis(100));
        counters.record_tick(Duration::from_millis(200));
        counters.record_tick(Duration::from_millis(300));

        assert_eq!(counters.ticks, 3);
        assert!((counters.avg_processing_ms - 200.0).abs() < 1e-9);
        assert!(counters.last_tick_at.is_some());
    }

    #[test]
    fn test_event_counters() {
        let mut counters = PerformanceCounters::new();
        counters.record_error();
        counters.record_error();
        counters.record_analysis();
        counters.record_scaling_decision();

        assert_eq!(counters.error_count, 2);
        assert_eq!(counters.analysis_runs, 1);
        assert_eq!(counters.scaling_decisions, 1);
        assert_eq!(counters.ticks, 0);
    }
}
