//! `fleetctl simulate`: evolve a fleet and report scaling activity

use anyhow::Result;
use colored::Colorize;
use fleet_lib::{
    autoscaler::{ScaleAction, ScalingEvent},
    performance::PerformanceCounters,
    FleetConfig, ServerRecord,
};
use serde::Serialize;
use tabled::Tabled;

use super::{build_scheduler, run_ticks};
use crate::output::{
    color_status, color_usage, print_heading, print_info, print_json, print_table, print_warning,
    OutputFormat,
};

/// Row for the fleet table
#[derive(Tabled)]
struct ServerRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Env")]
    environment: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Disk")]
    disk: String,
    #[tabled(rename = "Latency")]
    latency: String,
    #[tabled(rename = "Errors")]
    errors: String,
}

impl From<&ServerRecord> for ServerRow {
    fn from(record: &ServerRecord) -> Self {
        let m = &record.metrics;
        Self {
            id: record.id.clone(),
            role: record.role.to_string(),
            environment: record.environment.to_string(),
            status: color_status(record.status),
            cpu: color_usage(m.cpu_percent),
            memory: color_usage(m.memory_percent),
            disk: color_usage(m.disk_percent),
            latency: format!("{:.0}ms", m.http_request_duration_secs * 1000.0),
            errors: format!("{}/{}", m.http_errors_total, m.http_requests_total),
        }
    }
}

/// Row for the scaling events table
#[derive(Tabled)]
struct ScalingRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Servers")]
    servers: String,
    #[tabled(rename = "Server")]
    server: String,
    #[tabled(rename = "Result")]
    result: String,
}

impl From<&ScalingEvent> for ScalingRow {
    fn from(event: &ScalingEvent) -> Self {
        let action = match event.action {
            ScaleAction::ScaleOut => event.action.to_string().green().to_string(),
            ScaleAction::ScaleIn => event.action.to_string().yellow().to_string(),
            ScaleAction::Maintain => event.action.to_string(),
        };
        Self {
            time: event.timestamp.format("%H:%M:%S").to_string(),
            action,
            servers: format!("{} → {}", event.from_count, event.to_count),
            server: event.server_id.clone().unwrap_or_else(|| "-".to_string()),
            result: if event.success {
                "ok".green().to_string()
            } else {
                "failed".red().to_string()
            },
        }
    }
}

#[derive(Serialize)]
struct SimulationSummary {
    ticks: u32,
    initial_servers: usize,
    failed_ticks: u32,
    counters: PerformanceCounters,
    servers: Vec<ServerRecord>,
    scaling_events: Vec<ScalingEvent>,
}

/// Run the simulation and print the resulting fleet
pub async fn run(config: FleetConfig, ticks: u32, format: OutputFormat) -> Result<()> {
    let autoscale = config.autoscaling.enabled;
    let profile = config.fleet.profile;
    let scheduler = build_scheduler(config)?;
    let initial_servers = scheduler.status_counts().await.total();

    let failed_ticks = run_ticks(&scheduler, ticks, autoscale).await;

    let summary = SimulationSummary {
        ticks,
        initial_servers,
        failed_ticks,
        counters: scheduler.counters().await,
        servers: scheduler.fleet_snapshot().await,
        scaling_events: scheduler.scaling_history(usize::MAX).await,
    };

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => {
            print_heading("Fleet Simulation");
            println!("Profile:                {}", profile.to_string().cyan());
            println!("Ticks:                  {}", summary.ticks);
            println!(
                "Servers:                {} → {}",
                summary.initial_servers,
                summary.servers.len()
            );
            println!(
                "Avg tick time:          {:.2}ms",
                summary.counters.avg_processing_ms
            );
            println!();

            let rows: Vec<ServerRow> = summary.servers.iter().map(ServerRow::from).collect();
            print_table(&rows);
            println!();

            println!("{}", "Scaling Events".bold());
            println!("{}", "-".repeat(60));
            if summary.scaling_events.is_empty() {
                print_info("No scaling events");
            } else {
                let rows: Vec<ScalingRow> =
                    summary.scaling_events.iter().map(ScalingRow::from).collect();
                print_table(&rows);
            }

            if summary.failed_ticks > 0 {
                print_warning(&format!("{} ticks failed", summary.failed_ticks));
            }
        }
    }

    Ok(())
}
