//! Simulator configuration
//!
//! Loaded once by the host process and handed to the scheduler. The core never
//! reads files or environment variables itself; `validate` is expected to be
//! called by whoever loads the configuration.

use crate::error::ConfigError;
use crate::factory::MAX_FLEET_SIZE;
use crate::models::ArchitectureProfile;
use serde::{Deserialize, Serialize};

/// Top-level simulator configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetConfig {
    #[serde(default)]
    pub fleet: FleetSettings,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub ai_analysis: AnalysisConfig,
    #[serde(default)]
    pub autoscaling: AutoscalingConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
}

/// Initial population settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetSettings {
    #[serde(default = "default_initial_servers")]
    pub initial_servers: usize,
    #[serde(default)]
    pub profile: ArchitectureProfile,
    /// Seed for the simulation RNG; entropy when absent
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_cluster")]
    pub cluster: String,
    #[serde(default = "default_version")]
    pub version: String,
}

/// Metric generation job settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_generation_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_true")]
    pub realistic_patterns: bool,
    #[serde(default)]
    pub failure_scenarios: bool,
}

/// Health analysis job settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_analysis_interval")]
    pub interval_secs: u64,
    /// Advisory engine preference flags
    #[serde(default = "default_true")]
    pub prefer_local_engine: bool,
    #[serde(default)]
    pub prefer_remote_engine: bool,
}

/// Autoscaler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoscalingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_min_servers")]
    pub min_servers: usize,
    #[serde(default = "default_max_servers")]
    pub max_servers: usize,
    #[serde(default = "default_target_cpu")]
    pub target_cpu_percent: f64,
    #[serde(default = "default_autoscaling_interval")]
    pub interval_secs: u64,
}

/// Performance settings; only `parallel_processing` changes behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceConfig {
    #[serde(default)]
    pub batching: bool,
    #[serde(default)]
    pub caching: bool,
    #[serde(default)]
    pub parallel_processing: bool,
    #[serde(default = "default_monitor_interval")]
    pub monitor_interval_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_initial_servers() -> usize {
    10
}

fn default_cluster() -> String {
    "sim-cluster-1".to_string()
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_generation_interval() -> u64 {
    30
}

fn default_analysis_interval() -> u64 {
    60
}

fn default_min_servers() -> usize {
    3
}

fn default_max_servers() -> usize {
    30
}

fn default_target_cpu() -> f64 {
    70.0
}

fn default_autoscaling_interval() -> u64 {
    // Four generation ticks so the scaler always sees freshly evolved data
    default_generation_interval() * 4
}

fn default_monitor_interval() -> u64 {
    300
}

impl Default for FleetSettings {
    fn default() -> Self {
        Self {
            initial_servers: default_initial_servers(),
            profile: ArchitectureProfile::default(),
            seed: None,
            cluster: default_cluster(),
            version: default_version(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_generation_interval(),
            realistic_patterns: true,
            failure_scenarios: false,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_analysis_interval(),
            prefer_local_engine: true,
            prefer_remote_engine: false,
        }
    }
}

impl Default for AutoscalingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_servers: default_min_servers(),
            max_servers: default_max_servers(),
            target_cpu_percent: default_target_cpu(),
            interval_secs: default_autoscaling_interval(),
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            batching: false,
            caching: false,
            parallel_processing: false,
            monitor_interval_secs: default_monitor_interval(),
        }
    }
}

impl FleetConfig {
    /// Reject configurations the control loops cannot honor
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scaling = &self.autoscaling;
        if scaling.min_servers > scaling.max_servers {
            return Err(ConfigError::InvalidFleetBounds {
                min: scaling.min_servers,
                max: scaling.max_servers,
            });
        }
        if scaling.max_servers > MAX_FLEET_SIZE {
            return Err(ConfigError::FleetTooLarge(scaling.max_servers));
        }
        if !(scaling.target_cpu_percent > 0.0 && scaling.target_cpu_percent <= 100.0) {
            return Err(ConfigError::InvalidTargetCpu(scaling.target_cpu_percent));
        }

        let intervals = [
            ("generation", self.generation.interval_secs),
            ("ai-analysis", self.ai_analysis.interval_secs),
            ("autoscaling", scaling.interval_secs),
            ("performance", self.performance.monitor_interval_secs),
        ];
        for (name, secs) in intervals {
            if secs == 0 {
                return Err(ConfigError::ZeroInterval(name));
            }
        }

        Ok(())
    }
}
