//! Scenario runner CLI
//!
//! Installs the Node.js test runner a scenario needs into a private prefix
//! and launches it with the right arguments and search paths.

use clap::Parser;
use scenario_runner::common::{config::Config, logging};
use scenario_runner::{cli, commands::Commands};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "scenario-runner", about = "Resolve and launch external test runners")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log probe and install details
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_cli(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };

    let result = match config {
        Ok(config) => cli::dispatch(cli.command, &config).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
