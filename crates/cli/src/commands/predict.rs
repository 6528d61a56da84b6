//! `fleetctl predict`: scaling forecast and recommendation

use anyhow::Result;
use colored::Colorize;
use fleet_lib::{
    autoscaler::{self, ScaleAction, ScalingPrediction, ScalingRecommendation},
    FleetConfig, FleetState,
};
use serde::Serialize;

use super::build_scheduler;
use crate::output::{format_percent, print_heading, print_info, print_json, OutputFormat};

#[derive(Serialize)]
struct PredictionSummary {
    prediction: ScalingPrediction,
    recommendation: ScalingRecommendation,
}

fn color_action(action: ScaleAction) -> String {
    match action {
        ScaleAction::ScaleOut => action.to_string().red().to_string(),
        ScaleAction::ScaleIn => action.to_string().yellow().to_string(),
        ScaleAction::Maintain => action.to_string().green().to_string(),
    }
}

/// Forecast scaling needs over `horizon_minutes` for a fresh fleet
pub async fn run(config: FleetConfig, horizon_minutes: u32, format: OutputFormat) -> Result<()> {
    let scaling = config.autoscaling.clone();
    let scheduler = build_scheduler(config)?;

    let prediction = scheduler.scaling_prediction(horizon_minutes).await;
    let fleet: FleetState = scheduler.fleet_snapshot().await.into_iter().collect();
    let recommendation = autoscaler::calculate_scaling_recommendation(&fleet, &scaling);
    let summary = PredictionSummary {
        prediction,
        recommendation,
    };

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => {
            let p = &summary.prediction;
            print_heading("Scaling Prediction");
            println!("Horizon:                {} min", p.horizon_minutes);
            println!("Current CPU:            {}", format_percent(p.current_cpu));
            println!("Predicted CPU:          {}", format_percent(p.predicted_cpu));
            println!("Trend:                  {:+.1}%/h", p.trend_per_hour);
            println!("Predicted action:       {}", color_action(p.predicted_action));
            println!("Confidence:             {:.0}%", p.confidence);
            match p.minutes_to_action {
                Some(minutes) if minutes <= 0.0 => print_info("Threshold already crossed"),
                Some(minutes) => print_info(&format!("Action expected in {:.0} min", minutes)),
                None => print_info("No scaling action expected"),
            }
            println!();

            let r = &summary.recommendation;
            print_heading("Recommendation");
            println!("Action:                 {}", color_action(r.action));
            println!(
                "Servers:                {} → {}",
                r.current_count, r.recommended_count
            );
            println!("Reason:                 {}", r.reason);
        }
    }

    Ok(())
}
