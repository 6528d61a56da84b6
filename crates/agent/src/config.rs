//! Agent configuration

use anyhow::{Context, Result};
use fleet_lib::FleetConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default configuration file, overridden by `FLEET_CONFIG`
pub const DEFAULT_CONFIG_FILE: &str = "fleet.toml";

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Node name attached to structured log events
    #[serde(default = "default_node_name")]
    pub node_name: String,

    /// API server port for health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Simulator configuration handed to the scheduler
    #[serde(default)]
    pub fleet: FleetConfig,
}

fn default_node_name() -> String {
    std::env::var("NODE_NAME").unwrap_or_else(|_| "fleet-simulator".to_string())
}

fn default_api_port() -> u16 {
    8080
}

impl AgentConfig {
    /// Load configuration from the config file and environment
    ///
    /// The file named by `FLEET_CONFIG` (default `fleet.toml`) is optional.
    /// Environment variables prefixed with `FLEET__` override it, with `__`
    /// separating nested keys, e.g. `FLEET__FLEET__INITIAL_SERVERS=20`.
    pub fn load() -> Result<Self> {
        let path = std::env::var("FLEET_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(&path)
    }

    /// Load from an explicit file path, then apply environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("FLEET")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("failed to read configuration from {}", path.display()))?;

        let config: AgentConfig = settings
            .try_deserialize()
            .context("invalid agent configuration")?;
        config.fleet.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_lib::ArchitectureProfile;
    use std::fs;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AgentConfig::load_from(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.api_port, 8080);
        assert_eq!(config.fleet, FleetConfig::default());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fleet.toml");
        fs::write(
            &path,
            r#"
api_port = 9100

[fleet.fleet]
initial_servers = 20
profile = "enterprise"
seed = 42

[fleet.autoscaling]
max_servers = 40
"#,
        )
        .unwrap();

        let config = AgentConfig::load_from(&path).unwrap();

        assert_eq!(config.api_port, 9100);
        assert_eq!(config.fleet.fleet.initial_servers, 20);
        assert_eq!(config.fleet.fleet.profile, ArchitectureProfile::Enterprise);
        assert_eq!(config.fleet.fleet.seed, Some(42));
        assert_eq!(config.fleet.autoscaling.max_servers, 40);
        assert_eq!(config.fleet.autoscaling.min_servers, 3);
    }

    #[test]
    fn test_invalid_fleet_bounds_fail_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fleet.toml");
        fs::write(
            &path,
            r#"
[fleet.autoscaling]
min_servers = 12
max_servers = 4
"#,
        )
        .unwrap();

        let err = AgentConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("min_servers (12)"));
    }
}
