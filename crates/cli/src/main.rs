//! Fleet simulator CLI
//!
//! Runs the fleet simulator in-process for a fixed number of ticks and
//! prints the resulting fleet, health analysis, efficiency and scaling
//! forecasts.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use commands::{efficiency, health, predict, simulate};
use fleet_lib::ArchitectureProfile;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Fleet simulator CLI
#[derive(Parser)]
#[command(name = "fleetctl")]
#[command(author, version, about = "CLI for the fleet simulator", long_about = None)]
pub struct Cli {
    /// Simulator configuration file (TOML, JSON or YAML)
    #[arg(long, env = "FLEET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Seed for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Log simulator events to stderr
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Initial fleet options shared by every command
#[derive(Args)]
pub struct FleetArgs {
    /// Number of servers to generate
    #[arg(long, short = 'n')]
    pub servers: Option<usize>,

    /// Architecture profile (minimal, standard, enterprise)
    #[arg(long, short)]
    pub profile: Option<ArchitectureProfile>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evolve a fleet and show the result with scaling events
    Simulate {
        #[command(flatten)]
        fleet: FleetArgs,

        /// Generation ticks to run; autoscaling runs every 4th tick
        #[arg(long, short, default_value_t = 20)]
        ticks: u32,
    },

    /// Show fleet health and per-server analysis
    Health {
        #[command(flatten)]
        fleet: FleetArgs,

        /// Generation ticks to run before analysing
        #[arg(long, short, default_value_t = 10)]
        ticks: u32,
    },

    /// Show performance and efficiency reports
    Efficiency {
        #[command(flatten)]
        fleet: FleetArgs,

        /// Generation ticks to run before measuring
        #[arg(long, short, default_value_t = 10)]
        ticks: u32,
    },

    /// Forecast scaling needs
    Predict {
        #[command(flatten)]
        fleet: FleetArgs,

        /// Forecast horizon in minutes
        #[arg(long, default_value_t = 60)]
        horizon: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("debug"))
            .with_writer(std::io::stderr)
            .init();
    }

    let base = config::load_fleet_config(cli.config.as_deref())?;
    let seed = cli.seed;
    let with_fleet = |fleet: FleetArgs| {
        config::apply_overrides(base.clone(), fleet.servers, fleet.profile, seed)
    };

    // Execute command
    match cli.command {
        Commands::Simulate { fleet, ticks } => {
            simulate::run(with_fleet(fleet)?, ticks, cli.format).await?;
        }
        Commands::Health { fleet, ticks } => {
            health::run(with_fleet(fleet)?, ticks, cli.format).await?;
        }
        Commands::Efficiency { fleet, ticks } => {
            efficiency::run(with_fleet(fleet)?, ticks, cli.format).await?;
        }
        Commands::Predict { fleet, horizon } => {
            predict::run(with_fleet(fleet)?, horizon, cli.format).await?;
        }
    }

    Ok(())
}
