//! `fleetctl efficiency`: performance and efficiency reports

use anyhow::Result;
use colored::Colorize;
use fleet_lib::{
    performance::{EfficiencyReport, PerformanceReport},
    FleetConfig,
};
use serde::Serialize;
use tabled::Tabled;

use super::{build_scheduler, run_ticks};
use crate::output::{
    color_score, format_percent, print_heading, print_json, print_success, print_table,
    OutputFormat,
};

/// Row for the efficiency breakdown table
#[derive(Tabled)]
struct ScoreRow {
    #[tabled(rename = "Component")]
    component: &'static str,
    #[tabled(rename = "Score")]
    score: String,
}

/// Row for the bottleneck table
#[derive(Tabled)]
struct BottleneckRow {
    #[tabled(rename = "Bottleneck")]
    kind: String,
    #[tabled(rename = "Recommendation")]
    recommendation: &'static str,
}

#[derive(Serialize)]
struct EfficiencySummary {
    performance: PerformanceReport,
    efficiency: EfficiencyReport,
}

/// Evolve the fleet and print both reports
pub async fn run(config: FleetConfig, ticks: u32, format: OutputFormat) -> Result<()> {
    let autoscale = config.autoscaling.enabled;
    let scheduler = build_scheduler(config)?;

    run_ticks(&scheduler, ticks, autoscale).await;

    let summary = EfficiencySummary {
        performance: scheduler.performance_report().await,
        efficiency: scheduler.efficiency_report().await,
    };

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => {
            let perf = &summary.performance;
            print_heading("Performance");
            println!(
                "{} {}",
                "System score:".bold(),
                color_score(perf.system_score)
            );
            println!("Ticks:                  {}", perf.ticks);
            println!("Avg tick time:          {:.2}ms", perf.avg_processing_ms);
            println!("Errors:                 {}", perf.error_count);
            if let Some(bytes) = perf.resident_bytes {
                println!(
                    "Resident memory:        {:.1}Mi",
                    bytes as f64 / (1024.0 * 1024.0)
                );
            }
            let breakdown = &perf.server_breakdown;
            println!(
                "Servers:                {} healthy, {} warning, {} critical",
                breakdown.healthy.to_string().green(),
                breakdown.warning.to_string().yellow(),
                breakdown.critical.to_string().red()
            );
            for recommendation in &perf.recommendations {
                println!("  • {}", recommendation);
            }
            println!();

            let eff = &summary.efficiency;
            print_heading("Efficiency");
            let row = |component, score| ScoreRow { component, score };
            let rows = [
                row("CPU", color_score(eff.cpu_efficiency)),
                row("Memory", color_score(eff.memory_efficiency)),
                row("Resources", color_score(eff.resource_efficiency)),
                row("Response time", color_score(eff.response_score)),
                row("Errors", color_score(eff.error_score)),
                row("Uptime", format_percent(eff.uptime_ratio)),
                row("Overall", color_score(eff.overall)),
            ];
            print_table(&rows);

            if eff.bottlenecks.is_empty() {
                print_success("No bottlenecks detected");
            } else {
                let rows: Vec<BottleneckRow> = eff
                    .bottlenecks
                    .iter()
                    .map(|b| BottleneckRow {
                        kind: b.to_string(),
                        recommendation: b.recommendation(),
                    })
                    .collect();
                print_table(&rows);
            }
        }
    }

    Ok(())
}
