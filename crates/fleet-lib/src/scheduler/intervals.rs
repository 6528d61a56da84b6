//! Load-adaptive job intervals

use super::jobs::JobKind;
use crate::config::FleetConfig;
use crate::models::FleetState;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Intervals never drop below this
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Current tick interval of every job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobIntervals {
    pub generation: Duration,
    pub analysis: Duration,
    pub autoscaling: Duration,
    pub performance: Duration,
}

impl JobIntervals {
    /// Intervals exactly as configured
    pub fn from_config(config: &FleetConfig) -> Self {
        Self {
            generation: Duration::from_secs(config.generation.interval_secs),
            analysis: Duration::from_secs(config.ai_analysis.interval_secs),
            autoscaling: Duration::from_secs(config.autoscaling.interval_secs),
            performance: Duration::from_secs(config.performance.monitor_interval_secs),
        }
    }

    pub fn for_job(&self, job: JobKind) -> Duration {
        match job {
            JobKind::Generation => self.generation,
            JobKind::AiAnalysis => self.analysis,
            JobKind::Autoscaling => self.autoscaling,
            JobKind::Performance => self.performance,
        }
    }
}

/// Load observed on the fleet, used to retune intervals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObservedLoad {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub error_rate_percent: f64,
}

impl ObservedLoad {
    pub fn from_fleet(fleet: &FleetState) -> Self {
        Self {
            cpu_percent: fleet.average_cpu(),
            memory_percent: fleet.average_memory(),
            error_rate_percent: fleet.error_rate() * 100.0,
        }
    }

    /// Multiplier applied to every interval
    ///
    /// Heavy load slows the simulation down, light load speeds it up.
    pub fn interval_factor(&self) -> f64 {
        let cpu = self.cpu_percent;
        let memory = self.memory_percent;

        if cpu > 85.0 || memory > 90.0 {
            2.0
        } else if cpu > 70.0 || memory > 80.0 {
            1.2
        } else if cpu < 30.0 && memory < 40.0 {
            0.8
        } else if cpu < 50.0 && memory < 60.0 {
            0.9
        } else {
            1.0
        }
    }
}

/// Scale the configured intervals to the observed load
///
/// Always derived from the configured base so repeated calls with the same
/// load give the same result. A high error rate additionally halves the
/// performance interval.
pub fn optimize(base: &JobIntervals, load: &ObservedLoad) -> JobIntervals {
    let factor = load.interval_factor();
    let performance_factor = if load.error_rate_percent > 5.0 {
        factor * 0.5
    } else {
        factor
    };

    JobIntervals {
        generation: scale(base.generation, factor),
        analysis: scale(base.analysis, factor),
        autoscaling: scale(base.autoscaling, factor),
        performance: scale(base.performance, performance_factor),
    }
}

fn scale(interval: Duration, factor: f64) -> Duration {
    interval.mul_f64(factor).max(MIN_INTERVAL)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(cpu: f64, memory: f64, errors: f64) -> ObservedLoad {
        ObservedLoad {
            cpu_percent: cpu,
            memory_percent: memory,
            error_rate_percent: errors,
        }
    }

    #[test]
    fn test_factor_bands() {
        assert_eq!(load(90.0, 50.0, 0.0).interval_factor(), 2.0);
        assert_eq!(load(50.0, 95.0, 0.0).interval_factor(), 2.0);
        assert_eq!(load(75.0, 50.0, 0.0).interval_factor(), 1.2);
        assert_eq!(load(20.0, 30.0, 0.0).interval_factor(), 0.8);
        assert_eq!(load(40.0, 50.0, 0.0).interval_factor(), 0.9);
        assert_eq!(load(60.0, 70.0, 0.0).interval_factor(), 1.0);
    }

    #[test]
    fn test_heavy_load_doubles_intervals() {
        let base = JobIntervals::from_config(&FleetConfig::default());
        let tuned = optimize(&base, &load(90.0, 50.0, 0.0));

        assert_eq!(tuned.generation, Duration::from_secs(60));
        assert_eq!(tuned.analysis, Duration::from_secs(120));
        assert_eq!(tuned.autoscaling, Duration::from_secs(240));
        assert_eq!(tuned.performance, Duration::from_secs(600));
    }

    #[test]
    fn test_error_rate_halves_performance_only() {
        let base = JobIntervals::from_config(&FleetConfig::default());
        let tuned = optimize(&base, &load(60.0, 70.0, 7.5));

        assert_eq!(tuned.generation, base.generation);
        assert_eq!(tuned.performance, Duration::from_secs(150));
    }

    #[test]
    fn test_floor_at_one_second() {
        let base = JobIntervals {
            generation: Duration::from_secs(1),
            analysis: Duration::from_secs(1),
            autoscaling: Duration::from_secs(1),
            performance: Duration::from_secs(1),
        };
        let tuned = optimize(&base, &load(10.0, 10.0, 50.0));

        assert_eq!(tuned.generation, MIN_INTERVAL);
        assert_eq!(tuned.performance, MIN_INTERVAL);
    }

    #[test]
    fn test_optimize_is_not_cumulative() {
        let base = JobIntervals::from_config(&FleetConfig::default());
        let heavy = load(95.0, 95.0, 0.0);

        let first = optimize(&base, &heavy);
        let second = optimize(&base, &heavy);
        assert_eq!(first, second);
    }
}
