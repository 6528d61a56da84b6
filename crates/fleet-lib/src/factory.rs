//! Fleet construction
//!
//! Builds the initial population of simulated servers from an architecture
//! profile and creates individual servers for scale-out.

use crate::config::FleetSettings;
use crate::models::{
    ArchitectureProfile, Environment, FleetState, ServerMetrics, ServerRecord, ServerRole,
    ServerStatus,
};
use crate::status;
use chrono::Utc;
use rand::Rng;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Upper bound on the number of simulated servers
pub const MAX_FLEET_SIZE: usize = 50;

/// Number of records in the error-state fleet
pub const ERROR_STATE_FLEET_SIZE: usize = 3;

const THIRTY_DAYS_SECS: u64 = 30 * 24 * 60 * 60;

/// (role, environment, count) proportion table for one profile
type ProfileTable = &'static [(ServerRole, Environment, usize)];

const MINIMAL_TABLE: ProfileTable = &[
    (ServerRole::Web, Environment::Production, 2),
    (ServerRole::Api, Environment::Production, 1),
    (ServerRole::Database, Environment::Production, 1),
    (ServerRole::Cache, Environment::Production, 1),
];

const STANDARD_TABLE: ProfileTable = &[
    (ServerRole::Web, Environment::Production, 3),
    (ServerRole::Api, Environment::Production, 3),
    (ServerRole::Database, Environment::Production, 2),
    (ServerRole::Cache, Environment::Production, 2),
    (ServerRole::Worker, Environment::Production, 2),
    (ServerRole::Web, Environment::Staging, 1),
    (ServerRole::Api, Environment::Staging, 1),
    (ServerRole::Web, Environment::Development, 1),
];

const ENTERPRISE_TABLE: ProfileTable = &[
    (ServerRole::Web, Environment::Production, 6),
    (ServerRole::Api, Environment::Production, 6),
    (ServerRole::Database, Environment::Production, 4),
    (ServerRole::Cache, Environment::Production, 3),
    (ServerRole::Worker, Environment::Production, 4),
    (ServerRole::Web, Environment::Staging, 2),
    (ServerRole::Api, Environment::Staging, 2),
    (ServerRole::Database, Environment::Staging, 1),
    (ServerRole::Worker, Environment::Staging, 1),
    (ServerRole::Web, Environment::Development, 1),
    (ServerRole::Api, Environment::Development, 1),
];

fn profile_table(profile: ArchitectureProfile) -> ProfileTable {
    match profile {
        ArchitectureProfile::Minimal => MINIMAL_TABLE,
        ArchitectureProfile::Standard => STANDARD_TABLE,
        ArchitectureProfile::Enterprise => ENTERPRISE_TABLE,
    }
}

/// Creates simulated servers and initial fleets
#[derive(Debug, Clone)]
pub struct FleetFactory {
    cluster: String,
    version: String,
}

impl Default for FleetFactory {
    fn default() -> Self {
        Self::from_settings(&FleetSettings::default())
    }
}

impl FleetFactory {
    pub fn new(cluster: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            version: version.into(),
        }
    }

    pub fn from_settings(settings: &FleetSettings) -> Self {
        Self::new(settings.cluster.clone(), settings.version.clone())
    }

    /// Build the initial fleet for a profile
    ///
    /// Always returns exactly `min(target_count, 50)` records for a non-zero
    /// target. A zero target yields the error-state fleet.
    pub fn initialize_fleet<R: Rng + ?Sized>(
        &self,
        target_count: usize,
        profile: ArchitectureProfile,
        rng: &mut R,
    ) -> FleetState {
        let target = target_count.min(MAX_FLEET_SIZE);
        if target_count > MAX_FLEET_SIZE {
            warn!(
                requested = target_count,
                limit = MAX_FLEET_SIZE,
                "Requested fleet size clamped"
            );
        }

        let mut fleet = FleetState::new();

        'table: for &(role, environment, count) in profile_table(profile) {
            for _ in 0..count {
                if fleet.len() >= target {
                    break 'table;
                }
                self.spawn_server(&mut fleet, environment, role, rng);
            }
        }

        // Fill any shortfall with production web servers
        while fleet.len() < target {
            self.spawn_server(&mut fleet, Environment::Production, ServerRole::Web, rng);
        }

        if fleet.is_empty() {
            warn!("Fleet generation produced no servers, using error-state fleet");
            return self.generate_error_state_servers();
        }

        info!(
            servers = fleet.len(),
            profile = ?profile,
            "Initialized simulated fleet"
        );
        fleet
    }

    /// Allocate an id, create a server and insert it into the fleet
    pub fn spawn_server<R: Rng + ?Sized>(
        &self,
        fleet: &mut FleetState,
        environment: Environment,
        role: ServerRole,
        rng: &mut R,
    ) -> String {
        let sequence = fleet.next_sequence();
        let id = format!("{}-{}-{:02}", role, environment.short_name(), sequence);
        let record = self.create_server(&id, environment, role, sequence, rng);
        debug!(server_id = %id, status = %record.status, "Created server");
        fleet.insert(record);
        id
    }

    /// Generate one server with metrics drawn from its role's band
    pub fn create_server<R: Rng + ?Sized>(
        &self,
        id: &str,
        environment: Environment,
        role: ServerRole,
        sequence: u64,
        rng: &mut R,
    ) -> ServerRecord {
        let multiplier = role.load_multiplier();
        let cpu = (rng.random_range(20.0..=80.0) * multiplier).clamp(0.0, 100.0);
        let memory = (rng.random_range(30.0..=75.0) * multiplier).clamp(0.0, 100.0);

        let metrics = ServerMetrics {
            cpu_percent: cpu,
            memory_percent: memory,
            disk_percent: rng.random_range(20.0..=70.0),
            network_rx: rng.random_range(10.0..=100.0),
            network_tx: rng.random_range(5.0..=80.0),
            uptime_secs: rng.random_range(0..=THIRTY_DAYS_SECS),
            http_request_duration_secs: 0.05 + cpu / 100.0 * 0.5,
            http_requests_total: rng.random_range(100..=1000),
            http_errors_total: rng.random_range(1..=10),
        };

        let mut record = ServerRecord {
            id: id.to_string(),
            name: id.to_string(),
            hostname: id.to_string(),
            environment,
            role,
            status: ServerStatus::Healthy,
            metrics,
            last_updated: Utc::now(),
            labels: self.labels(environment, role),
            analysis: None,
            sequence,
        };
        Self::refresh_status(&mut record);
        record
    }

    /// Fixed fallback fleet signalling total generation failure
    pub fn generate_error_state_servers(&self) -> FleetState {
        (1..=ERROR_STATE_FLEET_SIZE as u64)
            .map(|n| {
                let id = format!("error-server-{}", n);
                ServerRecord {
                    id: id.clone(),
                    name: id.clone(),
                    hostname: id,
                    environment: Environment::Error,
                    role: ServerRole::Error,
                    status: ServerStatus::Critical,
                    metrics: ServerMetrics::zeroed(),
                    last_updated: Utc::now(),
                    labels: self.labels(Environment::Error, ServerRole::Error),
                    analysis: None,
                    sequence: n,
                }
            })
            .collect()
    }

    /// Recompute a record's status from its current metrics
    pub fn refresh_status(record: &mut ServerRecord) {
        record.status = status::classify(&record.metrics);
    }

    fn labels(&self, environment: Environment, role: ServerRole) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::new();
        labels.insert("environment".to_string(), environment.to_string());
        labels.insert("role".to_string(), role.to_string());
        labels.insert("cluster".to_string(), self.cluster.clone());
        labels.insert("version".to_string(), self.version.clone());
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_initialize_fleet_exact_counts() {
        let factory = FleetFactory::default();
        let mut rng = StdRng::seed_from_u64(42);

        for profile in [
            ArchitectureProfile::Minimal,
            ArchitectureProfile::Standard,
            ArchitectureProfile::Enterprise,
        ] {
            for n in [1, 3, 5, 12, 15, 31, 50, 75] {
                let fleet = factory.initialize_fleet(n, profile, &mut rng);
                assert_eq!(fleet.len(), n.min(MAX_FLEET_SIZE), "{:?} n={}", profile, n);
            }
        }
    }

    #[test]
    fn test_shortfall_filled_with_production_web() {
        let factory = FleetFactory::default();
        let mut rng = StdRng::seed_from_u64(1);

        // Minimal table has 5 entries, the remaining 5 must be web/production
        let fleet = factory.initialize_fleet(10, ArchitectureProfile::Minimal, &mut rng);
        let web_prod = fleet
            .records()
            .filter(|r| r.role == ServerRole::Web && r.environment == Environment::Production)
            .count();
        assert_eq!(web_prod, 7);
    }

    #[test]
    fn test_zero_target_falls_back_to_error_state() {
        let factory = FleetFactory::default();
        let mut rng = StdRng::seed_from_u64(1);

        let fleet = factory.initialize_fleet(0, ArchitectureProfile::Standard, &mut rng);
        assert_eq!(fleet.len(), ERROR_STATE_FLEET_SIZE);
    }

    #[test]
    fn test_error_state_servers() {
        let fleet = FleetFactory::default().generate_error_state_servers();

        assert_eq!(fleet.len(), 3);
        for record in fleet.records() {
            assert_eq!(record.status, ServerStatus::Critical);
            assert_eq!(record.environment, Environment::Error);
            assert_eq!(record.role, ServerRole::Error);
            assert_eq!(record.metrics, ServerMetrics::zeroed());
        }
    }

    #[test]
    fn test_create_server_within_bounds() {
        let factory = FleetFactory::new("test-cluster", "2.0.0");
        let mut rng = StdRng::seed_from_u64(9);

        for (i, role) in [
            ServerRole::Web,
            ServerRole::Api,
            ServerRole::Database,
            ServerRole::Cache,
            ServerRole::Worker,
        ]
        .into_iter()
        .enumerate()
        {
            for _ in 0..50 {
                let record =
                    factory.create_server("s", Environment::Production, role, i as u64, &mut rng);
                let m = &record.metrics;
                assert!((0.0..=100.0).contains(&m.cpu_percent));
                assert!((0.0..=100.0).contains(&m.memory_percent));
                assert!((0.0..=100.0).contains(&m.disk_percent));
                assert!(m.uptime_secs <= THIRTY_DAYS_SECS);
                assert!(m.http_requests_total > 0);
                assert!(m.http_errors_total > 0);
                assert_eq!(record.status, status::classify(m));
            }
        }
    }

    #[test]
    fn test_identity_and_labels() {
        let factory = FleetFactory::new("test-cluster", "2.0.0");
        let mut rng = StdRng::seed_from_u64(3);
        let mut fleet = FleetState::new();

        let id = factory.spawn_server(
            &mut fleet,
            Environment::Staging,
            ServerRole::Cache,
            &mut rng,
        );
        let record = fleet.get(&id).unwrap();

        assert_eq!(id, "cache-stg-01");
        assert_eq!(record.name, record.id);
        assert_eq!(record.hostname, record.id);
        assert_eq!(record.labels["cluster"], "test-cluster");
        assert_eq!(record.labels["version"], "2.0.0");
        assert_eq!(record.labels["role"], "cache");
        assert_eq!(record.labels["environment"], "staging");
    }

    #[test]
    fn test_ids_unique_across_spawns() {
        let factory = FleetFactory::default();
        let mut rng = StdRng::seed_from_u64(5);
        let mut fleet = factory.initialize_fleet(20, ArchitectureProfile::Enterprise, &mut rng);

        for _ in 0..10 {
            factory.spawn_server(&mut fleet, Environment::Production, ServerRole::Web, &mut rng);
        }
        assert_eq!(fleet.len(), 30);
    }
}
