//! Metric evolution
//!
//! Advances one server's metrics by a single tick. Evolution is a pure
//! function of the input record, the configuration, the tick time and the
//! random source handed in by the caller.

use crate::config::GenerationConfig;
use crate::error::{FleetError, Result};
use crate::models::{ServerMetrics, ServerRecord};
use crate::status;
use chrono::{DateTime, Timelike, Utc};
use rand::Rng;
use tracing::debug;

/// Probability per tick that a failure scenario is injected
pub const FAILURE_PROBABILITY: f64 = 0.05;

/// Probability per tick that new HTTP errors are recorded
pub const ERROR_PROBABILITY: f64 = 0.05;

const CPU_RANGE: (f64, f64) = (5.0, 95.0);
const MEMORY_RANGE: (f64, f64) = (10.0, 90.0);
const DISK_RANGE: (f64, f64) = (0.0, 95.0);
const NETWORK_RANGE: (f64, f64) = (0.1, 1000.0);

/// Drift applied to the CPU factor window when realistic patterns are on
const DIURNAL_SHIFT: f64 = 0.01;

/// Injected failure that distorts a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureScenario {
    CpuSpike,
    MemoryLeak,
    NetworkCongestion,
    ErrorBurst,
}

impl FailureScenario {
    pub const ALL: [FailureScenario; 4] = [
        FailureScenario::CpuSpike,
        FailureScenario::MemoryLeak,
        FailureScenario::NetworkCongestion,
        FailureScenario::ErrorBurst,
    ];

    fn pick<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }

    /// Apply this scenario to already evolved metrics
    pub fn apply<R: Rng + ?Sized>(&self, metrics: &mut ServerMetrics, rng: &mut R) {
        match self {
            FailureScenario::CpuSpike => {
                metrics.cpu_percent = (metrics.cpu_percent * 1.8).min(95.0);
                metrics.http_request_duration_secs *= 2.5;
            }
            FailureScenario::MemoryLeak => {
                metrics.memory_percent = (metrics.memory_percent * 1.5).min(98.0);
            }
            FailureScenario::NetworkCongestion => {
                metrics.network_rx = (metrics.network_rx * 0.3).max(NETWORK_RANGE.0);
                metrics.network_tx = (metrics.network_tx * 0.3).max(NETWORK_RANGE.0);
                metrics.http_request_duration_secs *= 1.8;
            }
            FailureScenario::ErrorBurst => {
                metrics.http_errors_total = metrics
                    .http_errors_total
                    .saturating_add(rng.random_range(0..50));
                metrics.http_request_duration_secs *= 1.4;
            }
        }
    }
}

/// Response time tracks load rather than its own history
pub fn request_duration_for(cpu_percent: f64) -> f64 {
    0.05 + cpu_percent / 100.0 * 0.5
}

/// Advance one record by one tick
pub fn evolve<R: Rng + ?Sized>(
    record: &ServerRecord,
    config: &GenerationConfig,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<ServerRecord> {
    if !record.metrics.is_finite() {
        return Err(FleetError::Generation {
            server_id: record.id.clone(),
            reason: "non-finite metric value".to_string(),
        });
    }

    let mut next = record.clone();
    let m = &mut next.metrics;

    let (cpu_low, cpu_high) = cpu_factor_window(config, now);
    m.cpu_percent = drift(m.cpu_percent, cpu_low, cpu_high, CPU_RANGE, rng);
    m.memory_percent = drift(m.memory_percent, 0.98, 1.02, MEMORY_RANGE, rng);
    m.disk_percent = drift(m.disk_percent, 1.0, 1.001, DISK_RANGE, rng);
    m.network_rx = drift(m.network_rx, 0.7, 1.5, NETWORK_RANGE, rng);
    m.network_tx = drift(m.network_tx, 0.7, 1.5, NETWORK_RANGE, rng);

    m.uptime_secs = m.uptime_secs.saturating_add(config.interval_secs);
    m.http_requests_total = m
        .http_requests_total
        .saturating_add(rng.random_range(0..100));
    if rng.random_bool(ERROR_PROBABILITY) {
        m.http_errors_total = m.http_errors_total.saturating_add(rng.random_range(0..5));
    }

    m.http_request_duration_secs = request_duration_for(m.cpu_percent);

    if config.failure_scenarios && rng.random_bool(FAILURE_PROBABILITY) {
        let scenario = FailureScenario::pick(rng);
        scenario.apply(m, rng);
        debug!(server_id = %next.id, scenario = ?scenario, "Injected failure scenario");
    }

    next.status = status::classify(&next.metrics);
    next.last_updated = now;
    Ok(next)
}

/// Multiply by a uniform factor and clamp to bounds
fn drift<R: Rng + ?Sized>(
    value: f64,
    low: f64,
    high: f64,
    bounds: (f64, f64),
    rng: &mut R,
) -> f64 {
    (value * rng.random_range(low..=high)).clamp(bounds.0, bounds.1)
}

/// CPU factor window, nudged by time of day when realistic patterns are on
fn cpu_factor_window(config: &GenerationConfig, now: DateTime<Utc>) -> (f64, f64) {
    let shift = if !config.realistic_patterns {
        0.0
    } else {
        match now.hour() {
            9..=17 => DIURNAL_SHIFT,
            0..=5 => -DIURNAL_SHIFT,
            _ => 0.0,
        }
    };
    (0.95 + shift, 1.05 + shift)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::record;
    use crate::models::ServerStatus;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn chaos_config() -> GenerationConfig {
        GenerationConfig {
            failure_scenarios: true,
            ..GenerationConfig::default()
        }
    }

    #[test]
    fn test_bounds_hold_over_many_ticks() {
        let mut rng = StdRng::seed_from_u64(11);
        let config = chaos_config();
        let mut current = record("web-prod-01", 60.0, 60.0, 1);
        current.metrics.disk_percent = 94.9;

        for _ in 0..5_000 {
            let next = evolve(&current, &config, Utc::now(), &mut rng).unwrap();
            let m = &next.metrics;
            assert!((0.0..=100.0).contains(&m.cpu_percent));
            assert!((0.0..=100.0).contains(&m.memory_percent));
            assert!((0.0..=100.0).contains(&m.disk_percent));
            assert!((0.1..=1000.0).contains(&m.network_rx));
            assert!((0.1..=1000.0).contains(&m.network_tx));
            assert!(m.uptime_secs >= current.metrics.uptime_secs);
            assert!(m.http_requests_total >= current.metrics.http_requests_total);
            assert!(m.http_errors_total >= current.metrics.http_errors_total);
            assert_eq!(next.status, status::classify(m));
            current = next;
        }
    }

    #[test]
    fn test_duration_tracks_cpu() {
        let mut rng = StdRng::seed_from_u64(3);
        let config = GenerationConfig::default();
        let mut current = record("api-prod-01", 40.0, 40.0, 1);
        current.metrics.http_request_duration_secs = 9.0;

        let next = evolve(&current, &config, Utc::now(), &mut rng).unwrap();
        let expected = request_duration_for(next.metrics.cpu_percent);
        assert!((next.metrics.http_request_duration_secs - expected).abs() < 1e-12);
    }

    #[test]
    fn test_uptime_advances_by_interval() {
        let mut rng = StdRng::seed_from_u64(3);
        let config = GenerationConfig {
            interval_secs: 45,
            ..GenerationConfig::default()
        };
        let current = record("api-prod-01", 40.0, 40.0, 1);

        let next = evolve(&current, &config, Utc::now(), &mut rng).unwrap();
        assert_eq!(next.metrics.uptime_secs, current.metrics.uptime_secs + 45);
    }

    #[test]
    fn test_disk_only_grows() {
        let mut rng = StdRng::seed_from_u64(21);
        let config = GenerationConfig::default();
        let mut current = record("db-prod-01", 40.0, 40.0, 1);

        for _ in 0..200 {
            let next = evolve(&current, &config, Utc::now(), &mut rng).unwrap();
            assert!(next.metrics.disk_percent >= current.metrics.disk_percent);
            current = next;
        }
    }

    #[test]
    fn test_seeded_evolution_is_reproducible() {
        let config = GenerationConfig::default();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let current = record("web-prod-01", 50.0, 50.0, 1);

        let a = evolve(&current, &config, now, &mut StdRng::seed_from_u64(99)).unwrap();
        let b = evolve(&current, &config, now, &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(a.metrics, b.metrics);
    }

    #[test]
    fn test_non_finite_record_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut current = record("web-prod-01", 50.0, 50.0, 1);
        current.metrics.memory_percent = f64::INFINITY;

        let result = evolve(&current, &GenerationConfig::default(), Utc::now(), &mut rng);
        assert!(matches!(result, Err(FleetError::Generation { .. })));
    }

    #[test]
    fn test_cpu_factor_window_diurnal() {
        let config = GenerationConfig::default();
        let noon = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let night = Utc.with_ymd_and_hms(2024, 5, 1, 3, 0, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2024, 5, 1, 20, 0, 0).unwrap();

        let close = |(a, b): (f64, f64), (x, y): (f64, f64)| {
            (a - x).abs() < 1e-9 && (b - y).abs() < 1e-9
        };

        assert!(close(cpu_factor_window(&config, noon), (0.96, 1.06)));
        assert!(close(cpu_factor_window(&config, night), (0.94, 1.04)));
        assert!(close(cpu_factor_window(&config, evening), (0.95, 1.05)));

        let flat = GenerationConfig {
            realistic_patterns: false,
            ..GenerationConfig::default()
        };
        assert!(close(cpu_factor_window(&flat, noon), (0.95, 1.05)));
    }

    #[test]
    fn test_cpu_spike_scenario() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut metrics = record("web-prod-01", 80.0, 50.0, 1).metrics;
        let before = metrics.http_request_duration_secs;

        FailureScenario::CpuSpike.apply(&mut metrics, &mut rng);
        assert_eq!(metrics.cpu_percent, 95.0);
        assert!((metrics.http_request_duration_secs - before * 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_memory_leak_scenario_caps_at_98() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut metrics = record("web-prod-01", 30.0, 85.0, 1).metrics;

        FailureScenario::MemoryLeak.apply(&mut metrics, &mut rng);
        assert_eq!(metrics.memory_percent, 98.0);
        assert_eq!(status::classify(&metrics), ServerStatus::Critical);
    }

    #[test]
    fn test_network_congestion_respects_floor() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut metrics = record("web-prod-01", 30.0, 50.0, 1).metrics;
        metrics.network_rx = 0.2;
        metrics.network_tx = 100.0;

        FailureScenario::NetworkCongestion.apply(&mut metrics, &mut rng);
        assert_eq!(metrics.network_rx, 0.1);
        assert!((metrics.network_tx - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_error_burst_only_increases_errors() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut metrics = record("web-prod-01", 30.0, 50.0, 1).metrics;
        let before = metrics.http_errors_total;

        FailureScenario::ErrorBurst.apply(&mut metrics, &mut rng);
        assert!(metrics.http_errors_total >= before);
        assert!(metrics.http_errors_total < before + 50);
    }
}
