//! ## drillhund-cli
//! **Headless drill runner**
//!
//! Replays a scenario deterministically on a virtual clock, answers the
//! questions from the command line, and prints the transcript every terminal
//! would have shown, plus a digest for replay validation.

use clap::Parser;

use drillhund_config::DrillhundConfig;
use drillhund_telemetry::logging::EventLogger;
use drillhund_telemetry::metrics::MetricsRecorder;

mod commands;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = DrillhundConfig::load()?;
    EventLogger::init_with_level(&config.telemetry.log_level);
    let metrics = MetricsRecorder::new();
    let cli = Cli::parse();

    match cli.command {
        Commands::Replay(replay_args) => {
            commands::run_replay_mode(replay_args, config, metrics).await?
        }
        Commands::Demo(demo_args) => commands::run_demo_mode(demo_args, metrics).await?,
    }
    Ok(())
}
