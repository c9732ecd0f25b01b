//! `payload-tool` - operator CLI entry point.
//!
//! Startup sequence:
//! 1. Parse [`Cli`] from arguments and environment variables.
//! 2. Initialise stderr logging.
//! 3. Read the input, run the subcommand, and write its output to stdout.

mod commands;
mod config;
mod telemetry;

use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;

use config::Cli;

fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cli = Cli::parse();

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init(&cli.log_level)?;

    // -----------------------------------------------------------------------
    // 3. Command
    // -----------------------------------------------------------------------
    let input = cli.command.read_input()?;
    let output = commands::run(&cli, &input)?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&output).context("failed to write output")?;
    stdout.write_all(b"\n").context("failed to write output")?;
    Ok(())
}
