//! Per-server scoring
//!
//! Rule-based prediction and anomaly scores. Both are pure functions of the
//! record's current metrics.

use crate::models::ServerMetrics;

/// Error rate above which the prediction score is penalised
const ERROR_RATE_PENALTY_THRESHOLD: f64 = 0.01;

/// Forward-looking health indicator (0-100, higher is healthier)
///
/// # Arguments
/// * `metrics` - Current metrics of a single server
///
/// # Returns
/// * 100 for an unloaded server, reduced by CPU, memory, latency and error penalties
pub fn prediction_score(metrics: &ServerMetrics) -> f64 {
    let mut score: f64 = 100.0;

    if metrics.cpu_percent > 80.0 {
        score -= (metrics.cpu_percent - 80.0) * 2.0;
    }
    if metrics.memory_percent > 85.0 {
        score -= (metrics.memory_percent - 85.0) * 3.0;
    }
    if metrics.http_request_duration_secs > 1.0 {
        score -= (metrics.http_request_duration_secs - 1.0) * 20.0;
    }

    let error_rate = metrics.error_rate();
    if error_rate > ERROR_RATE_PENALTY_THRESHOLD {
        score -= error_rate * 100.0 * 50.0;
    }

    score.clamp(0.0, 100.0)
}

/// Unusual metric combination indicator (0-100, higher is worse)
pub fn anomaly_score(metrics: &ServerMetrics) -> f64 {
    let mut score: f64 = 0.0;

    // Saturated CPU with almost no memory in use
    if metrics.cpu_percent > 95.0 && metrics.memory_percent < 20.0 {
        score += 30.0;
    }
    // Saturated memory with an idle CPU
    if metrics.memory_percent > 95.0 && metrics.cpu_percent < 10.0 {
        score += 25.0;
    }
    if metrics.http_request_duration_secs > 5.0 {
        score += 40.0;
    }

    // Receiving with nothing transmitted is an unbounded ratio
    let skewed_network = if metrics.network_tx > 0.0 {
        !(0.1..=10.0).contains(&(metrics.network_rx / metrics.network_tx))
    } else {
        metrics.network_rx > 0.0
    };
    if skewed_network {
        score += 20.0;
    }

    score.clamp(0.0, 100.0)
}
