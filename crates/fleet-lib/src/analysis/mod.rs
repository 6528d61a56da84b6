//! Health analysis for simulated servers
//!
//! This module provides:
//! - Per-server prediction and anomaly scores
//! - Operator advisories in Korean
//! - Fleet-wide health summaries
//!
//! Every function here is deterministic; analysing an unchanged fleet twice
//! yields identical results.

mod recommendations;
mod scoring;

pub use recommendations::{advisories, MAX_ADVISORIES, NORMAL_MESSAGE};
pub use scoring::{anomaly_score, prediction_score};

use crate::error::{FleetError, Result};
use crate::models::{FleetState, ServerAnalysis, ServerRecord, ServerStatus};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fleet-wide health summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemHealth {
    pub avg_cpu: f64,
    pub avg_memory: f64,
    pub critical_count: usize,
    pub total_servers: usize,
    /// Share of non-critical servers (0-100)
    pub health_score: f64,
}

/// Score a single server
pub fn analyze(record: &ServerRecord) -> ServerAnalysis {
    ServerAnalysis {
        prediction_score: prediction_score(&record.metrics),
        anomaly_score: anomaly_score(&record.metrics),
        recommendation: generate_recommendation(record),
    }
}

/// Advisory text for a server, at most three advisories long
pub fn generate_recommendation(record: &ServerRecord) -> String {
    recommendations::recommend(&record.metrics)
}

/// Summarise the fleet; an empty fleet scores 0
pub fn analyze_system_health(fleet: &FleetState) -> SystemHealth {
    let total = fleet.len();
    let critical_count = fleet
        .records()
        .filter(|r| r.status == ServerStatus::Critical)
        .count();

    let health_score = if total == 0 {
        0.0
    } else {
        (total - critical_count) as f64 / total as f64 * 100.0
    };

    SystemHealth {
        avg_cpu: fleet.average_cpu(),
        avg_memory: fleet.average_memory(),
        critical_count,
        total_servers: total,
        health_score,
    }
}

/// Analyse every server without touching the fleet
///
/// Fails on the first record whose metrics cannot be scored, in which case
/// the caller should keep the previous analysis for the whole fleet.
pub fn analyze_fleet(fleet: &FleetState) -> Result<Vec<(String, ServerAnalysis)>> {
    let mut results = Vec::with_capacity(fleet.len());

    for record in fleet.records() {
        if !record.metrics.is_finite() {
            return Err(FleetError::Analysis {
                server_id: record.id.clone(),
                reason: "metrics contain non-finite values".to_string(),
            });
        }
        results.push((record.id.clone(), analyze(record)));
    }

    debug!(servers = results.len(), "Fleet analysis computed");
    Ok(results)
}

/// Attach analysis results to their records
///
/// Results for servers that left the fleet in the meantime are ignored.
pub fn commit_analysis(fleet: &mut FleetState, results: Vec<(String, ServerAnalysis)>) -> usize {
    let mut applied = 0;
    for (id, analysis) in results {
        if let Some(record) = fleet.get_mut(&id) {
            record.analysis = Some(analysis);
            applied += 1;
        }
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::{fleet_with_cpu, record};

    #[test]
    fn test_unusual_cpu_memory_combination() {
        let r = record("a", 96.0, 15.0, 1);
        let analysis = analyze(&r);
        assert!(analysis.anomaly_score >= 30.0);
    }

    #[test]
    fn test_high_error_rate_lowers_prediction() {
        let mut r = record("a", 40.0, 50.0, 1);
        let baseline = analyze(&r).prediction_score;

        r.metrics.http_requests_total = 1000;
        r.metrics.http_errors_total = 60;
        let degraded = analyze(&r).prediction_score;

        assert!(degraded < baseline);
    }

    #[test]
    fn test_quiet_server_gets_normal_message() {
        let r = record("a", 30.0, 40.0, 1);
        let analysis = analyze(&r);
        assert_eq!(analysis.recommendation, NORMAL_MESSAGE);
        assert_eq!(analysis.prediction_score, 100.0);
        assert_eq!(analysis.anomaly_score, 0.0);
    }

    #[test]
    fn test_system_health_score() {
        let mut fleet = fleet_with_cpu(4, 50.0);
        let id = fleet.ids().into_iter().next().unwrap();
        fleet.get_mut(&id).unwrap().status = ServerStatus::Critical;

        let health = analyze_system_health(&fleet);
        assert_eq!(health.critical_count, 1);
        assert_eq!(health.total_servers, 4);
        assert_eq!(health.health_score, 75.0);
        assert_eq!(health.avg_cpu, 50.0);
    }

    #[test]
    fn test_system_health_empty_fleet() {
        let health = analyze_system_health(&FleetState::new());
        assert_eq!(health.health_score, 0.0);
        assert_eq!(health.total_servers, 0);
    }

    #[test]
    fn test_analyze_fleet_is_idempotent() {
        let fleet = fleet_with_cpu(6, 88.0);
        let first = analyze_fleet(&fleet).unwrap();
        let second = analyze_fleet(&fleet).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_analyze_fleet_rejects_non_finite() {
        let mut fleet = fleet_with_cpu(3, 50.0);
        fleet.get_mut("web-prod-02").unwrap().metrics.memory_percent = f64::INFINITY;

        let result = analyze_fleet(&fleet);
        assert!(matches!(
            result,
            Err(FleetError::Analysis { ref server_id, .. }) if server_id == "web-prod-02"
        ));
    }

    #[test]
    fn test_commit_analysis_skips_departed_servers() {
        let mut fleet = fleet_with_cpu(3, 50.0);
        let mut results = analyze_fleet(&fleet).unwrap();
        results.push(("gone".to_string(), results[0].1.clone()));

        let applied = commit_analysis(&mut fleet, results);
        assert_eq!(applied, 3);
        assert!(fleet.records().all(|r| r.analysis.is_some()));
    }
}
