use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "irrigo",
    version,
    about = "Weather-adjusted irrigation for OpenSprinkler-style controllers"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config.yaml
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the directory holding the state database
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Wake on the configured interval until interrupted
    Run,
    /// Run a single wake cycle and exit
    Once,
    /// Show persisted irrigation state
    Status,
    /// Validate config and test connections
    Check,
    /// Run interactive setup
    Init,
    /// Forget persisted state, as on first boot
    Reset,
}
