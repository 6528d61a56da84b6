//! Fleet Agent - long-running fleet simulator
//!
//! Generates a simulated server fleet, drives the periodic simulator jobs
//! over it and serves health, readiness and Prometheus metrics.

use anyhow::Result;
use fleet_agent::{api, config::AgentConfig};
use fleet_lib::{JobKind, Scheduler, SchedulerEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting fleet-agent");

    // Load configuration; invalid configuration aborts start-up
    let config = AgentConfig::load()?;
    info!(
        node_name = %config.node_name,
        servers = config.fleet.fleet.initial_servers,
        profile = %config.fleet.fleet.profile,
        "Agent configured"
    );

    let (scheduler, events) = Scheduler::builder(config.fleet.clone())
        .node_name(config.node_name.clone())
        .build()?;
    let scheduler = Arc::new(scheduler);

    let events_handle = tokio::spawn(drain_events(Arc::clone(&scheduler), events));

    let started = scheduler.start().await;
    info!(jobs = started, "Simulator jobs started");

    let app_state = Arc::new(api::AppState::new(Arc::clone(&scheduler)));

    // Mark agent as ready once the jobs are running
    app_state.health_registry.set_ready(true).await;

    // Start health and metrics server
    let api_handle = tokio::spawn(api::serve(config.api_port, Arc::clone(&app_state)));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    app_state.health_registry.set_ready(false).await;
    let stopped = scheduler.stop().await;
    info!(jobs = stopped, "Simulator jobs stopped");

    api_handle.abort();
    events_handle.abort();

    Ok(())
}

/// Log scheduler events and retune job intervals after each performance tick
async fn drain_events(scheduler: Arc<Scheduler>, mut events: mpsc::Receiver<SchedulerEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            SchedulerEvent::TickCompleted { job, elapsed_ms } => {
                debug!(job = %job, elapsed_ms, "Job tick completed");
                if job == JobKind::Performance {
                    let load = scheduler.observed_load().await;
                    scheduler.optimize_intervals(load).await;
                }
            }
            SchedulerEvent::Scaled(event) => {
                debug!(
                    action = %event.action,
                    from = event.from_count,
                    to = event.to_count,
                    success = event.success,
                    "Scaling event"
                );
            }
            SchedulerEvent::JobFailed { job, error } => {
                warn!(job = %job, error = %error, "Job tick failed");
            }
            SchedulerEvent::StatusChanged { .. } | SchedulerEvent::IntervalsChanged(_) => {}
        }
    }
}
