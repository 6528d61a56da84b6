//! In-process simulator commands

pub mod efficiency;
pub mod health;
pub mod predict;
pub mod simulate;

use anyhow::Result;
use fleet_lib::{FleetConfig, JobKind, Scheduler};

/// Autoscaling runs once every this many generation ticks
pub const AUTOSCALE_EVERY: u32 = 4;

/// Build a scheduler over a freshly generated fleet
///
/// Jobs are never started; commands drive them one tick at a time.
pub fn build_scheduler(config: FleetConfig) -> Result<Scheduler> {
    let (scheduler, _events) = Scheduler::builder(config).node_name("fleetctl").build()?;
    Ok(scheduler)
}

/// Run `ticks` generation ticks, autoscaling after every fourth one
///
/// Returns the number of failed ticks.
pub async fn run_ticks(scheduler: &Scheduler, ticks: u32, autoscale: bool) -> u32 {
    let mut failures = 0;
    for tick in 1..=ticks {
        if !scheduler.run_job_once(JobKind::Generation).await {
            failures += 1;
        }
        if autoscale
            && tick % AUTOSCALE_EVERY == 0
            && !scheduler.run_job_once(JobKind::Autoscaling).await
        {
            failures += 1;
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> FleetConfig {
        let mut config = FleetConfig::default();
        config.fleet.seed = Some(3);
        config.fleet.initial_servers = 5;
        config
    }

    #[tokio::test]
    async fn test_run_ticks_counts_generation_ticks() {
        let scheduler = build_scheduler(config()).unwrap();

        assert_eq!(run_ticks(&scheduler, 6, false).await, 0);

        let counters = scheduler.counters().await;
        assert_eq!(counters.ticks, 6);
        assert_eq!(counters.scaling_decisions, 0);
    }

    #[tokio::test]
    async fn test_run_ticks_autoscales_every_fourth_tick() {
        let scheduler = build_scheduler(config()).unwrap();

        run_ticks(&scheduler, 8, true).await;

        assert_eq!(scheduler.counters().await.scaling_decisions, 2);
    }
}
