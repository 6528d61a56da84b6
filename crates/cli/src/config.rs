//! Configuration management for the CLI

use anyhow::{Context, Result};
use fleet_lib::{ArchitectureProfile, FleetConfig};
use std::path::Path;

/// Load the simulator configuration
///
/// Without a file the built-in defaults are used. The format follows the
/// file extension (`.toml`, `.json`, `.yaml`).
pub fn load_fleet_config(path: Option<&Path>) -> Result<FleetConfig> {
    let Some(path) = path else {
        return Ok(FleetConfig::default());
    };

    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .build()
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    settings
        .try_deserialize()
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

/// Apply command-line overrides and validate the result
pub fn apply_overrides(
    mut config: FleetConfig,
    servers: Option<usize>,
    profile: Option<ArchitectureProfile>,
    seed: Option<u64>,
) -> Result<FleetConfig> {
    if let Some(servers) = servers {
        config.fleet.initial_servers = servers;
    }
    if let Some(profile) = profile {
        config.fleet.profile = profile;
    }
    if seed.is_some() {
        config.fleet.seed = seed;
    }

    config.validate().context("Invalid simulator configuration")?;
    Ok(config)
}
