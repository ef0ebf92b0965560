//! ZoomLOD CLI - inspect and replay level-of-detail fetch decisions.

mod commands;
mod error;
mod scenario;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use zoomlod::logging;
use zoomlod::LodConfig;

use crate::commands::{estimate, levels, replay};
use crate::error::CliError;

#[derive(Parser)]
#[command(name = "zoomlod")]
#[command(about = "Zoom-aware level-of-detail fetch strategy tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Strategy configuration file (INI). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the zoom → detail level table
    Levels(levels::LevelsArgs),

    /// Estimate the on-screen pixel area of a square feature
    Estimate(estimate::EstimateArgs),

    /// Replay a JSON scenario of view changes and print each decision
    Replay(replay::ReplayArgs),
}

fn main() {
    let cli = Cli::parse();

    let guard = match logging::init_logging(cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => CliError::LoggingInit(e).exit(),
    };
    if let (true, Some(path)) = (guard.has_file(), &cli.log_file) {
        tracing::debug!(path = %path.display(), "Writing logs to file");
    }

    if let Err(e) = run(cli.config, cli.command) {
        e.exit();
    }
}

fn run(config_path: Option<PathBuf>, command: Commands) -> Result<(), CliError> {
    let config = match &config_path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Loading configuration");
            LodConfig::load_from(path)?
        }
        None => LodConfig::default(),
    };

    match command {
        Commands::Levels(args) => levels::run(&config, args),
        Commands::Estimate(args) => estimate::run(&config, args),
        Commands::Replay(args) => replay::run(config, args),
    }
}
