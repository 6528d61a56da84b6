//! Fleet efficiency scoring and bottleneck detection

use crate::models::{FleetState, ServerStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// CPU utilisation considered optimal (%)
pub const OPTIMAL_CPU_PERCENT: f64 = 65.0;

/// Memory utilisation considered optimal (%)
pub const OPTIMAL_MEMORY_PERCENT: f64 = 70.0;

const RESOURCE_WEIGHT: f64 = 0.30;
const RESPONSE_WEIGHT: f64 = 0.25;
const ERROR_WEIGHT: f64 = 0.25;
const UPTIME_WEIGHT: f64 = 0.20;

/// Classification of a fleet-level bottleneck
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bottleneck {
    CpuOverload,
    MemoryExhaustion,
    ResponseTimeDegradation,
    HighErrorRate,
    LowAvailability,
}

impl Bottleneck {
    /// Suggested mitigation
    pub fn recommendation(&self) -> &'static str {
        match self {
            Self::CpuOverload => "CPU 과부하 상태입니다. 스케일 아웃을 권장합니다.",
            Self::MemoryExhaustion => "메모리가 부족합니다. 메모리 증설 또는 누수 점검이 필요합니다.",
            Self::ResponseTimeDegradation => "응답 시간이 저하되었습니다. 캐시와 쿼리를 점검하세요.",
            Self::HighErrorRate => "오류율이 높습니다. 애플리케이션 로그를 확인하세요.",
            Self::LowAvailability => "가용성이 낮습니다. 위험 상태 서버를 복구하세요.",
        }
    }
}

impl fmt::Display for Bottleneck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CpuOverload => write!(f, "cpu-overload"),
            Self::MemoryExhaustion => write!(f, "memory-exhaustion"),
            Self::ResponseTimeDegradation => write!(f, "response-time-degradation"),
            Self::HighErrorRate => write!(f, "high-error-rate"),
            Self::LowAvailability => write!(f, "low-availability"),
        }
    }
}

/// Weighted efficiency breakdown of the fleet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyReport {
    pub cpu_efficiency: f64,
    pub memory_efficiency: f64,
    /// Mean of CPU and memory efficiency
    pub resource_efficiency: f64,
    pub response_score: f64,
    pub error_score: f64,
    /// Share of non-critical servers (0-100)
    pub uptime_ratio: f64,
    pub overall: f64,
    pub bottlenecks: Vec<Bottleneck>,
}

/// Scores how close the fleet runs to its optimal operating point
#[derive(Debug, Clone, Default)]
pub struct EfficiencyCalculator;

impl EfficiencyCalculator {
    pub fn new() -> Self {
        Self
    }

    pub fn calculate(&self, fleet: &FleetState) -> EfficiencyReport {
        let avg_cpu = fleet.average_cpu();
        let avg_memory = fleet.average_memory();

        let cpu_efficiency = distance_score(avg_cpu, OPTIMAL_CPU_PERCENT);
        let memory_efficiency = distance_score(avg_memory, OPTIMAL_MEMORY_PERCENT);
        let resource_efficiency = (cpu_efficiency + memory_efficiency) / 2.0;

        let avg_ms = fleet.average_duration_secs() * 1000.0;
        let response_score = if avg_ms > 100.0 {
            (100.0 - (avg_ms - 100.0) / 10.0).clamp(0.0, 100.0)
        } else {
            100.0
        };

        let error_percent = fleet.error_rate() * 100.0;
        let error_score = (100.0 - 10.0 * error_percent).clamp(0.0, 100.0);

        let uptime_ratio = if fleet.is_empty() {
            0.0
        } else {
            let available = fleet
                .records()
                .filter(|r| r.status != ServerStatus::Critical)
                .count();
            available as f64 / fleet.len() as f64 * 100.0
        };

        let overall = resource_efficiency * RESOURCE_WEIGHT
            + response_score * RESPONSE_WEIGHT
            + error_score * ERROR_WEIGHT
            + uptime_ratio * UPTIME_WEIGHT;

        let mut bottlenecks = Vec::new();
        if cpu_efficiency < 70.0 && avg_cpu > OPTIMAL_CPU_PERCENT {
            bottlenecks.push(Bottleneck::CpuOverload);
        }
        if memory_efficiency < 70.0 && avg_memory > OPTIMAL_MEMORY_PERCENT {
            bottlenecks.push(Bottleneck::MemoryExhaustion);
        }
        if response_score < 70.0 {
            bottlenecks.push(Bottleneck::ResponseTimeDegradation);
        }
        if error_score < 80.0 {
            bottlenecks.push(Bottleneck::HighErrorRate);
        }
        if uptime_ratio < 95.0 {
            bottlenecks.push(Bottleneck::LowAvailability);
        }

        EfficiencyReport {
            cpu_efficiency,
            memory_efficiency,
            resource_efficiency,
            response_score,
            error_score,
            uptime_ratio,
            overall,
            bottlenecks,
        }
    }
}

/// 100 at the optimum, minus two points per point of distance
fn distance_score(value: f64, optimum: f64) -> f64 {
    (100.0 - 2.0 * (value - optimum).abs()).clamp(0.0, 100.0)
}
