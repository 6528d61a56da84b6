//! Core data models for the fleet simulator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Deployment environment of a simulated server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Staging,
    Development,
    Fallback,
    Error,
}

impl Environment {
    /// Short form used in generated server ids
    pub fn short_name(&self) -> &'static str {
        match self {
            Environment::Production => "prod",
            Environment::Staging => "stg",
            Environment::Development => "dev",
            Environment::Fallback => "fallback",
            Environment::Error => "error",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Development => "development",
            Environment::Fallback => "fallback",
            Environment::Error => "error",
        };
        write!(f, "{}", name)
    }
}

/// Workload role of a simulated server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerRole {
    Web,
    Api,
    Database,
    Cache,
    Worker,
    Fallback,
    Error,
}

impl ServerRole {
    /// Multiplier applied to the base CPU/memory band at creation time
    pub fn load_multiplier(&self) -> f64 {
        match self {
            ServerRole::Database => 1.3,
            ServerRole::Api => 1.1,
            ServerRole::Web => 1.0,
            ServerRole::Cache => 0.8,
            ServerRole::Worker => 1.2,
            ServerRole::Fallback | ServerRole::Error => 1.0,
        }
    }
}

impl std::fmt::Display for ServerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ServerRole::Web => "web",
            ServerRole::Api => "api",
            ServerRole::Database => "database",
            ServerRole::Cache => "cache",
            ServerRole::Worker => "worker",
            ServerRole::Fallback => "fallback",
            ServerRole::Error => "error",
        };
        write!(f, "{}", name)
    }
}

/// Derived health status of a server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Healthy,
    Warning,
    Critical,
    Unknown,
}

impl std::fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerStatus::Healthy => write!(f, "healthy"),
            ServerStatus::Warning => write!(f, "warning"),
            ServerStatus::Critical => write!(f, "critical"),
            ServerStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Resource and request metrics of one server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerMetrics {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
    /// Network receive rate in MB/s
    pub network_rx: f64,
    /// Network transmit rate in MB/s
    pub network_tx: f64,
    pub uptime_secs: u64,
    pub http_request_duration_secs: f64,
    pub http_requests_total: u64,
    pub http_errors_total: u64,
}

impl ServerMetrics {
    /// Errors divided by requests, 0 when no requests were served
    pub fn error_rate(&self) -> f64 {
        if self.http_requests_total == 0 {
            0.0
        } else {
            self.http_errors_total as f64 / self.http_requests_total as f64
        }
    }

    /// True when every floating point metric is finite
    pub fn is_finite(&self) -> bool {
        [
            self.cpu_percent,
            self.memory_percent,
            self.disk_percent,
            self.network_rx,
            self.network_tx,
            self.http_request_duration_secs,
        ]
        .iter()
        .all(|v| v.is_finite())
    }

    /// All-zero metrics used by the error-state fleet
    pub fn zeroed() -> Self {
        Self {
            cpu_percent: 0.0,
            memory_percent: 0.0,
            disk_percent: 0.0,
            network_rx: 0.0,
            network_tx: 0.0,
            uptime_secs: 0,
            http_request_duration_secs: 0.0,
            http_requests_total: 0,
            http_errors_total: 0,
        }
    }
}

/// Heuristic analysis attached to a server by the health analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerAnalysis {
    /// Forward-looking health indicator, higher is healthier (0-100)
    pub prediction_score: f64,
    /// Unusual metric combination indicator, higher is worse (0-100)
    pub anomaly_score: f64,
    pub recommendation: String,
}

/// One simulated fleet member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerRecord {
    pub id: String,
    pub name: String,
    pub hostname: String,
    pub environment: Environment,
    pub role: ServerRole,
    pub status: ServerStatus,
    pub metrics: ServerMetrics,
    pub last_updated: DateTime<Utc>,
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<ServerAnalysis>,
    /// Creation order within the fleet
    pub sequence: u64,
}

/// Architecture profile used to pick role/environment proportions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchitectureProfile {
    Minimal,
    #[default]
    Standard,
    Enterprise,
}

impl std::fmt::Display for ArchitectureProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArchitectureProfile::Minimal => write!(f, "minimal"),
            ArchitectureProfile::Standard => write!(f, "standard"),
            ArchitectureProfile::Enterprise => write!(f, "enterprise"),
        }
    }
}

impl std::str::FromStr for ArchitectureProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minimal" => Ok(ArchitectureProfile::Minimal),
            "standard" => Ok(ArchitectureProfile::Standard),
            "enterprise" => Ok(ArchitectureProfile::Enterprise),
            other => Err(format!("unknown architecture profile: {}", other)),
        }
    }
}

/// Count of servers per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub healthy: usize,
    pub warning: usize,
    pub critical: usize,
    pub unknown: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.healthy + self.warning + self.critical + self.unknown
    }
}

/// The owned set of simulated servers, indexed by id
#[derive(Debug, Clone, Default)]
pub struct FleetState {
    servers: BTreeMap<String, ServerRecord>,
    next_sequence: u64,
}

impl FleetState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Reserve the next creation sequence number
    pub fn next_sequence(&mut self) -> u64 {
        self.next_sequence += 1;
        self.next_sequence
    }

    /// Insert a record, replacing any record with the same id
    pub fn insert(&mut self, record: ServerRecord) -> Option<ServerRecord> {
        self.next_sequence = self.next_sequence.max(record.sequence);
        self.servers.insert(record.id.clone(), record)
    }

    pub fn remove(&mut self, id: &str) -> Option<ServerRecord> {
        self.servers.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&ServerRecord> {
        self.servers.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ServerRecord> {
        self.servers.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.servers.contains_key(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.servers.keys().cloned().collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &ServerRecord> {
        self.servers.values()
    }

    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut ServerRecord> {
        self.servers.values_mut()
    }

    /// Id of the most recently added record
    pub fn most_recent_id(&self) -> Option<String> {
        self.servers
            .values()
            .max_by_key(|r| r.sequence)
            .map(|r| r.id.clone())
    }

    /// Read-only copy of all records ordered by creation
    pub fn snapshot(&self) -> Vec<ServerRecord> {
        let mut records: Vec<ServerRecord> = self.servers.values().cloned().collect();
        records.sort_by_key(|r| r.sequence);
        records
    }

    pub fn average_cpu(&self) -> f64 {
        self.average(|r| r.metrics.cpu_percent)
    }

    pub fn average_memory(&self) -> f64 {
        self.average(|r| r.metrics.memory_percent)
    }

    pub fn average_duration_secs(&self) -> f64 {
        self.average(|r| r.metrics.http_request_duration_secs)
    }

    /// Fleet-wide errors divided by fleet-wide requests
    pub fn error_rate(&self) -> f64 {
        let (requests, errors) = self.servers.values().fold((0u64, 0u64), |(req, err), r| {
            (
                req.saturating_add(r.metrics.http_requests_total),
                err.saturating_add(r.metrics.http_errors_total),
            )
        });
        if requests == 0 {
            0.0
        } else {
            errors as f64 / requests as f64
        }
    }

    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for record in self.servers.values() {
            match record.status {
                ServerStatus::Healthy => counts.healthy += 1,
                ServerStatus::Warning => counts.warning += 1,
                ServerStatus::Critical => counts.critical += 1,
                ServerStatus::Unknown => counts.unknown += 1,
            }
        }
        counts
    }

    fn average(&self, f: impl Fn(&ServerRecord) -> f64) -> f64 {
        if self.servers.is_empty() {
            return 0.0;
        }
        self.servers.values().map(f).sum::<f64>() / self.servers.len() as f64
    }
}

impl FromIterator<ServerRecord> for FleetState {
    fn from_iter<I: IntoIterator<Item = ServerRecord>>(iter: I) -> Self {
        let mut fleet = FleetState::new();
        for record in iter {
            fleet.insert(record);
        }
        fleet
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_error_rate_zero_requests() {
        let mut metrics = record("a", 10.0, 10.0, 1).metrics;
        metrics.http_requests_total = 0;
        metrics.http_errors_total = 5;
        assert_eq!(metrics.error_rate(), 0.0);
    }

    #[test]
    fn test_most_recent_id_uses_sequence() {
        let mut fleet = FleetState::new();
        fleet.insert(record("zzz", 10.0, 10.0, 1));
        fleet.insert(record("aaa", 10.0, 10.0, 7));
        fleet.insert(record("mmm", 10.0, 10.0, 3));

        assert_eq!(fleet.most_recent_id().as_deref(), Some("aaa"));
        assert_eq!(fleet.next_sequence(), 8);
    }

    #[test]
    fn test_snapshot_ordered_by_creation() {
        let mut fleet = FleetState::new();
        fleet.insert(record("b", 10.0, 10.0, 2));
        fleet.insert(record("a", 10.0, 10.0, 3));
        fleet.insert(record("c", 10.0, 10.0, 1));

        let ids: Vec<String> = fleet.snapshot().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_averages_empty_fleet() {
        let fleet = FleetState::new();
        assert_eq!(fleet.average_cpu(), 0.0);
        assert_eq!(fleet.average_memory(), 0.0);
        assert_eq!(fleet.error_rate(), 0.0);
    }

    #[test]
    fn test_profile_from_str() {
        assert_eq!(
            "Enterprise".parse::<ArchitectureProfile>().unwrap(),
            ArchitectureProfile::Enterprise
        );
        assert!("huge".parse::<ArchitectureProfile>().is_err());
    }
}
