//! Error types for the fleet simulator

use thiserror::Error;

/// Configuration rejected at load time
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("min_servers ({min}) must not exceed max_servers ({max})")]
    InvalidFleetBounds { min: usize, max: usize },

    #[error("max_servers ({0}) exceeds the fleet limit of 50")]
    FleetTooLarge(usize),

    #[error("target_cpu_percent must be in (0, 100], got {0}")]
    InvalidTargetCpu(f64),

    #[error("{0} interval must be greater than zero")]
    ZeroInterval(&'static str),
}

/// Errors raised by the simulator core
///
/// Every variant is counted by the scheduler and never propagated past a job
/// boundary.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("failed to evolve server {server_id}: {reason}")]
    Generation { server_id: String, reason: String },

    #[error("analysis failed for server {server_id}: {reason}")]
    Analysis { server_id: String, reason: String },

    #[error("scaling failed: {0}")]
    Scaling(String),

    #[error("job {0} is already registered and running")]
    DuplicateJob(&'static str),

    #[error("job {job} panicked: {message}")]
    JobPanicked { job: &'static str, message: String },

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, FleetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_messages() {
        let err = ConfigError::InvalidFleetBounds { min: 5, max: 2 };
        assert_eq!(
            err.to_string(),
            "min_servers (5) must not exceed max_servers (2)"
        );

        let err = ConfigError::FleetTooLarge(80);
        assert!(err.to_string().contains("50"));
    }

    #[test]
    fn test_fleet_error_from_config() {
        let err: FleetError = ConfigError::ZeroInterval("generation").into();
        assert!(matches!(err, FleetError::Config(_)));
        assert!(err.to_string().contains("generation interval"));
    }
}
