//! `fleetctl health`: fleet health summary and per-server analysis

use anyhow::Result;
use colored::Colorize;
use fleet_lib::{analysis::SystemHealth, FleetConfig, JobKind, ServerAnalysis, ServerStatus};
use serde::Serialize;
use tabled::Tabled;

use super::{build_scheduler, run_ticks};
use crate::output::{
    color_score, color_status, color_usage, format_percent, print_heading, print_json,
    print_success, print_table, print_warning, OutputFormat,
};

/// Row for the per-server analysis table
#[derive(Tabled)]
struct AnalysisRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Prediction")]
    prediction: String,
    #[tabled(rename = "Anomaly")]
    anomaly: String,
    #[tabled(rename = "Recommendation")]
    recommendation: String,
}

#[derive(Serialize)]
struct ServerHealth {
    id: String,
    status: ServerStatus,
    analysis: Option<ServerAnalysis>,
}

#[derive(Serialize)]
struct HealthSummary {
    system: SystemHealth,
    servers: Vec<ServerHealth>,
}

/// Evolve the fleet, analyse it once and print the result
pub async fn run(config: FleetConfig, ticks: u32, format: OutputFormat) -> Result<()> {
    let autoscale = config.autoscaling.enabled;
    let scheduler = build_scheduler(config)?;

    run_ticks(&scheduler, ticks, autoscale).await;
    if !scheduler.run_job_once(JobKind::AiAnalysis).await {
        print_warning("Analysis failed; showing the previous analysis where available");
    }

    let system = scheduler.system_health().await;
    let records = scheduler.fleet_snapshot().await;

    match format {
        OutputFormat::Json => {
            let summary = HealthSummary {
                system,
                servers: records
                    .into_iter()
                    .map(|r| ServerHealth {
                        id: r.id,
                        status: r.status,
                        analysis: r.analysis,
                    })
                    .collect(),
            };
            print_json(&summary)?;
        }
        OutputFormat::Table => {
            print_heading("Fleet Health");
            println!("Servers:                {}", system.total_servers);
            println!("Critical:               {}", system.critical_count);
            println!("Avg CPU:                {}", format_percent(system.avg_cpu));
            println!("Avg memory:             {}", format_percent(system.avg_memory));
            println!(
                "{} {}",
                "Health score:".bold(),
                color_score(system.health_score)
            );
            println!();

            let rows: Vec<AnalysisRow> = records
                .iter()
                .map(|r| {
                    let (prediction, anomaly, recommendation) = match &r.analysis {
                        Some(a) => (
                            color_score(a.prediction_score),
                            format!("{:.1}", a.anomaly_score),
                            a.recommendation.clone(),
                        ),
                        None => ("-".to_string(), "-".to_string(), "-".to_string()),
                    };
                    AnalysisRow {
                        id: r.id.clone(),
                        status: color_status(r.status),
                        cpu: color_usage(r.metrics.cpu_percent),
                        memory: color_usage(r.metrics.memory_percent),
                        prediction,
                        anomaly,
                        recommendation,
                    }
                })
                .collect();
            print_table(&rows);

            if system.critical_count == 0 {
                print_success("No critical servers");
            }
        }
    }

    Ok(())
}
