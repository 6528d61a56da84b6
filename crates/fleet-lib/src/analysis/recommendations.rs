//! Operator advisories derived from server metrics

use crate::models::ServerMetrics;

/// Maximum number of advisories combined into one recommendation
pub const MAX_ADVISORIES: usize = 3;

/// Returned when no advisory applies
pub const NORMAL_MESSAGE: &str = "시스템이 정상적으로 동작하고 있습니다.";

const CPU_CRITICAL: &str = "CPU 사용률이 매우 높습니다. 즉시 스케일 아웃 또는 부하 분산이 필요합니다.";
const CPU_HIGH: &str = "CPU 사용률이 높습니다. 리소스 확장을 검토하세요.";
const MEMORY_CRITICAL: &str = "메모리 사용률이 위험 수준입니다. 메모리 누수 점검 및 증설이 필요합니다.";
const MEMORY_HIGH: &str = "메모리 사용률이 높습니다. 캐시 정리 또는 메모리 증설을 고려하세요.";
const LATENCY_CRITICAL: &str = "응답 시간이 심각하게 지연되고 있습니다. 병목 구간을 즉시 확인하세요.";
const LATENCY_HIGH: &str = "응답 시간이 느려지고 있습니다. 쿼리 및 캐시 최적화를 검토하세요.";
const ERRORS_CRITICAL: &str = "오류율이 매우 높습니다. 최근 배포와 로그를 즉시 확인하세요.";
const ERRORS_HIGH: &str = "오류율이 증가하고 있습니다. 애플리케이션 로그를 점검하세요.";
const DISK_HIGH: &str = "디스크 사용률이 높습니다. 불필요한 파일 정리를 권장합니다.";
const NETWORK_HIGH: &str = "네트워크 수신 트래픽이 많습니다. 트래픽 분산을 검토하세요.";

/// All advisories that apply, in priority order
pub fn advisories(metrics: &ServerMetrics) -> Vec<&'static str> {
    let mut out = Vec::new();

    if metrics.cpu_percent > 85.0 {
        out.push(CPU_CRITICAL);
    } else if metrics.cpu_percent > 75.0 {
        out.push(CPU_HIGH);
    }

    if metrics.memory_percent > 90.0 {
        out.push(MEMORY_CRITICAL);
    } else if metrics.memory_percent > 80.0 {
        out.push(MEMORY_HIGH);
    }

    if metrics.http_request_duration_secs > 2.0 {
        out.push(LATENCY_CRITICAL);
    } else if metrics.http_request_duration_secs > 1.0 {
        out.push(LATENCY_HIGH);
    }

    let error_rate = metrics.error_rate();
    if error_rate > 0.05 {
        out.push(ERRORS_CRITICAL);
    } else if error_rate > 0.01 {
        out.push(ERRORS_HIGH);
    }

    if metrics.disk_percent > 85.0 {
        out.push(DISK_HIGH);
    }
    if metrics.network_rx > 80.0 {
        out.push(NETWORK_HIGH);
    }

    out
}

/// First three advisories joined by a space, or the normal message
pub fn recommend(metrics: &ServerMetrics) -> String {
    let advisories = advisories(metrics);
    if advisories.is_empty() {
        return NORMAL_MESSAGE.to_string();
    }
    advisories
        .into_iter()
        .take(MAX_ADVISORIES)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::record;

    #[test]
    fn test_normal_message_when_quiet() {
        let r = record("a", 40.0, 50.0, 1);
        assert_eq!(recommend(&r.metrics), NORMAL_MESSAGE);
    }

    #[test]
    fn test_priority_order_and_limit() {
        let mut r = record("a", 95.0, 95.0, 1);
        r.metrics.http_request_duration_secs = 3.0;
        r.metrics.disk_percent = 90.0;
        r.metrics.network_rx = 120.0;

        let all = advisories(&r.metrics);
        assert_eq!(all.len(), 5);

        let rec = recommend(&r.metrics);
        assert_eq!(
            rec,
            format!("{} {} {}", CPU_CRITICAL, MEMORY_CRITICAL, LATENCY_CRITICAL)
        );
        assert!(!rec.contains(DISK_HIGH));
    }

    #[test]
    fn test_severity_tiers_are_exclusive() {
        let r = record("a", 80.0, 85.0, 1);
        let all = advisories(&r.metrics);
        assert_eq!(all, vec![CPU_HIGH, MEMORY_HIGH]);
    }

    #[test]
    fn test_error_rate_advisories() {
        let mut r = record("a", 40.0, 50.0, 1);
        r.metrics.http_requests_total = 1000;
        r.metrics.http_errors_total = 20;
        assert_eq!(recommend(&r.metrics), ERRORS_HIGH);

        r.metrics.http_errors_total = 60;
        assert_eq!(recommend(&r.metrics), ERRORS_CRITICAL);
    }
}
