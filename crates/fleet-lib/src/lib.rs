//! Core library for the server fleet simulator
//!
//! This crate provides the core functionality for:
//! - Generating a fleet of simulated servers from an architecture profile
//! - Evolving server metrics over time, with optional failure injection
//! - Rule-based health analysis and advisories
//! - CPU-driven autoscaling with prediction
//! - Self-monitoring, efficiency scoring and periodic job scheduling
//! - Health checks and observability

pub mod analysis;
pub mod autoscaler;
pub mod config;
pub mod error;
pub mod evolver;
pub mod factory;
pub mod health;
pub mod models;
pub mod observability;
pub mod performance;
pub mod scheduler;
pub mod status;

pub use config::FleetConfig;
pub use error::{ConfigError, FleetError, Result};
pub use factory::{FleetFactory, MAX_FLEET_SIZE};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{FleetMetrics, StructuredLogger};
pub use scheduler::{JobKind, Scheduler, SchedulerEvent};
