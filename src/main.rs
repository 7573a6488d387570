//! Heart classifier - Main Entry Point
//!
//! Prepares the clinical dataset, trains and selects a model, and serves
//! predictions from the command line.

use clap::Parser;
use heart_classifier::cli::{resolve_config, run, Cli};
use heart_classifier::logging::init_logging;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    init_logging(config.json_logs);

    run(cli, config)
}
