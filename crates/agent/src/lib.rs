//! Fleet Agent - hosts the fleet simulator as a long-running service
//!
//! Exposes the configuration loader and the health/metrics API so the
//! binary and the integration tests share one router.

pub mod api;
pub mod config;
