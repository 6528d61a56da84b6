//! HTTP API for health checks, Prometheus metrics and simulator status

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use fleet_lib::{
    analysis::SystemHealth,
    autoscaler::ScalingRecommendation,
    health::{ComponentStatus, HealthRegistry},
    performance::{EfficiencyReport, PerformanceCounters, PerformanceReport},
    Scheduler, StatusCounts,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub scheduler: Arc<Scheduler>,
}

impl AppState {
    pub fn new(scheduler: Arc<Scheduler>) -> Self {
        Self {
            health_registry: scheduler.health(),
            scheduler,
        }
    }
}

/// Simulator status served on `/status`
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub live_jobs: Vec<String>,
    pub fleet_size: usize,
    pub servers: StatusCounts,
    pub counters: PerformanceCounters,
    pub interval_secs: IntervalSecs,
    pub recommendation: Option<ScalingRecommendation>,
    pub performance: Option<PerformanceReport>,
    pub efficiency: Option<EfficiencyReport>,
    pub system_health: Option<SystemHealth>,
}

#[derive(Debug, Serialize)]
pub struct IntervalSecs {
    pub generation: u64,
    pub analysis: u64,
    pub autoscaling: u64,
    pub performance: u64,
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Fleet and job status, using the reports from the latest job ticks
async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let scheduler = &state.scheduler;
    let servers = scheduler.status_counts().await;
    let (performance, efficiency, system_health) = scheduler.latest_reports().await;
    let intervals = scheduler.intervals();

    Json(StatusResponse {
        live_jobs: scheduler.live_jobs().await,
        fleet_size: servers.total(),
        servers,
        counters: scheduler.counters().await,
        interval_secs: IntervalSecs {
            generation: intervals.generation.as_secs(),
            analysis: intervals.analysis.as_secs(),
            autoscaling: intervals.autoscaling.as_secs(),
            performance: intervals.performance.as_secs(),
        },
        recommendation: scheduler.scaling_recommendation().await,
        performance,
        efficiency,
        system_health,
    })
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/status", get(status))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
