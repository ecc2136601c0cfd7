use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "dayplan-cli", version, about = "Dayplan CLI")]
struct Cli {
    /// Path to config.toml (defaults to the data directory)
    #[arg(long, global = true, env = "DAYPLAN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan a day from an events file
    Plan(commands::plan::PlanArgs),
    /// Show how an event title would be classified
    Classify(commands::classify::ClassifyArgs),
    /// Show home intervals for a wake/sleep window
    Intervals(commands::intervals::IntervalsArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    // stdout carries JSON; logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Plan(args) => commands::plan::run(args, config),
        Commands::Classify(args) => commands::classify::run(args),
        Commands::Intervals(args) => commands::intervals::run(args, config),
        Commands::Config { action } => commands::config::run(action, config),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
