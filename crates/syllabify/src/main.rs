//! `syllabify` - CLI for the syllabify course store
//!
//! This binary manages users, courses, assignments and schedules in the
//! configured `SQLite` database.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::Context;
use clap::Parser;

use syllabify::cli::{self, Cli};
use syllabify::{init_logging, Config};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    cli::execute(cli.command, &config, &mut out)?;
    Ok(())
}
