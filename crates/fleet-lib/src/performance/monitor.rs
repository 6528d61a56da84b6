//! Simulator performance report

use super::counters::PerformanceCounters;
use crate::models::{FleetState, StatusCounts};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Resident memory above which a recommendation is emitted
pub const RESIDENT_MEMORY_LIMIT_BYTES: u64 = 512 * 1024 * 1024;

/// Returned when no recommendation applies
pub const GOOD_PERFORMANCE_MESSAGE: &str = "현재 시스템 성능이 양호합니다.";

/// Snapshot of simulator health and fleet load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub generated_at: DateTime<Utc>,
    /// Overall simulator score (0-100)
    pub system_score: f64,
    pub avg_processing_ms: f64,
    pub error_count: u64,
    pub ticks: u64,
    /// Resident set size of the host process, when known
    pub resident_bytes: Option<u64>,
    pub server_breakdown: StatusCounts,
    pub avg_cpu: f64,
    pub avg_memory: f64,
    pub recommendations: Vec<String>,
}

/// Builds performance reports from counters and the current fleet
#[derive(Debug, Clone, Default)]
pub struct PerformanceMonitor;

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self
    }

    /// Score the simulator and collect recommendations
    ///
    /// # Arguments
    /// * `fleet` - Current fleet
    /// * `counters` - Job counters accumulated so far
    /// * `resident_bytes` - Resident memory of the host process, if available
    pub fn report(
        &self,
        fleet: &FleetState,
        counters: &PerformanceCounters,
        resident_bytes: Option<u64>,
    ) -> PerformanceReport {
        let breakdown = fleet.status_counts();
        let avg_cpu = fleet.average_cpu();
        let avg_memory = fleet.average_memory();

        PerformanceReport {
            generated_at: Utc::now(),
            system_score: Self::system_score(counters, &breakdown),
            avg_processing_ms: counters.avg_processing_ms,
            error_count: counters.error_count,
            ticks: counters.ticks,
            resident_bytes,
            server_breakdown: breakdown,
            avg_cpu,
            avg_memory,
            recommendations: Self::recommendations(
                counters,
                &breakdown,
                resident_bytes,
                avg_cpu,
                avg_memory,
            ),
        }
    }

    fn system_score(counters: &PerformanceCounters, breakdown: &StatusCounts) -> f64 {
        let mut score: f64 = 100.0;

        if counters.avg_processing_ms > 100.0 {
            score -= 10.0;
        }
        if counters.avg_processing_ms > 500.0 {
            score -= 20.0;
        }
        if counters.error_count > 5 {
            score -= 15.0;
        }
        if counters.error_count > 20 {
            score -= 25.0;
        }
        score -= 10.0 * breakdown.critical as f64;

        score.max(0.0)
    }

    fn recommendations(
        counters: &PerformanceCounters,
        breakdown: &StatusCounts,
        resident_bytes: Option<u64>,
        avg_cpu: f64,
        avg_memory: f64,
    ) -> Vec<String> {
        let mut out = Vec::new();

        if counters.avg_processing_ms > 500.0 {
            out.push("평균 처리 시간이 매우 깁니다. 병렬 처리 활성화를 검토하세요.".to_string());
        } else if counters.avg_processing_ms > 100.0 {
            out.push("평균 처리 시간이 증가했습니다. 배치 처리를 고려하세요.".to_string());
        }

        if resident_bytes.is_some_and(|bytes| bytes > RESIDENT_MEMORY_LIMIT_BYTES) {
            out.push("프로세스 메모리 사용량이 512MB를 초과했습니다. 캐시 크기를 줄이세요.".to_string());
        }

        if counters.error_count > 5 {
            out.push(format!(
                "작업 오류가 {}회 발생했습니다. 로그를 확인하세요.",
                counters.error_count
            ));
        }

        if breakdown.critical > 0 {
            out.push(format!(
                "위험 상태 서버 {}대가 있습니다. 즉시 점검이 필요합니다.",
                breakdown.critical
            ));
        }

        if avg_cpu > 80.0 {
            out.push("평균 CPU 사용률이 높습니다. 스케일 아웃을 검토하세요.".to_string());
        }
        if avg_memory > 85.0 {
            out.push("평균 메모리 사용률이 높습니다. 메모리 증설을 검토하세요.".to_string());
        }

        if out.is_empty() {
            out.push(GOOD_PERFORMANCE_MESSAGE.to_string());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::fleet_with_cpu;
    use crate::models::ServerStatus;

    #[test]
    fn test_quiet_simulator_scores_full() {
        let fleet = fleet_with_cpu(5, 40.0);
        let report = PerformanceMonitor::new().report(&fleet, &PerformanceCounters::new(), None);

        assert_eq!(report.system_score, 100.0);
        assert_eq!(report.recommendations, vec![GOOD_PERFORMANCE_MESSAGE.to_string()]);
        assert_eq!(report.server_breakdown.healthy, 5);
    }

    #[test]
    fn test_score_penalties_stack() {
        let fleet = fleet_with_cpu(5, 40.0);
        let counters = PerformanceCounters {
            avg_processing_ms: 600.0,
            error_count: 25,
            ..PerformanceCounters::default()
        };

        let report = PerformanceMonitor::new().report(&fleet, &counters, None);
        // 100 - 10 - 20 - 15 - 25
        assert_eq!(report.system_score, 30.0);
    }

    #[test]
    fn test_critical_servers_floor_at_zero() {
        let mut fleet = fleet_with_cpu(12, 40.0);
        for record in fleet.records_mut() {
            record.status = ServerStatus::Critical;
        }

        let report = PerformanceMonitor::new().report(&fleet, &PerformanceCounters::new(), None);
        assert_eq!(report.system_score, 0.0);
        assert!(report.recommendations.iter().any(|r| r.contains("12대")));
    }

    #[test]
    fn test_resident_memory_recommendation() {
        let fleet = fleet_with_cpu(2, 40.0);
        let monitor = PerformanceMonitor::new();
        let counters = PerformanceCounters::new();

        let small = monitor.report(&fleet, &counters, Some(64 * 1024 * 1024));
        assert_eq!(small.recommendations.len(), 1);
        assert_eq!(small.recommendations[0], GOOD_PERFORMANCE_MESSAGE);

        let large = monitor.report(&fleet, &counters, Some(RESIDENT_MEMORY_LIMIT_BYTES + 1));
        assert!(large.recommendations[0].contains("512MB"));
    }

    #[test]
    fn test_fleet_load_recommendations() {
        let fleet = fleet_with_cpu(3, 85.0);
        let report = PerformanceMonitor::new().report(&fleet, &PerformanceCounters::new(), None);

        assert!(report.recommendations.iter().any(|r| r.contains("CPU")));
        assert!(!report.recommendations.contains(&GOOD_PERFORMANCE_MESSAGE.to_string()));
    }
}
