mod cli;
mod commands;

use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use crewplan_core::CrewplanConfig;

use crate::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // load config: --config / CREWPLAN_CONFIG > ~/.crewplan/crewplan.toml
    let config = CrewplanConfig::load(cli.config.as_deref()).context("loading configuration")?;

    // logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.as_str().into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let output = commands::run(cli.command, &config, cli.format)?;
    std::io::stdout()
        .write_all(output.as_bytes())
        .context("writing output")?;
    Ok(())
}
