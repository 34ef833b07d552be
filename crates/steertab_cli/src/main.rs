use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cli;
mod commands;

use cli::{Cli, Commands};
use steertab_core::{classify::TableGeometry, SteerError};
use steertab_io::LoadError;

fn run(cli: Cli) -> anyhow::Result<()> {
    let geometry: TableGeometry = cli.geometry.into();
    match cli.command {
        Commands::Check { layout } => commands::check(geometry, &layout),
        Commands::Build { layout } => commands::build(geometry, &layout),
        Commands::Rules { rules, no_flip } => commands::rules(geometry, &rules, !no_flip),
        Commands::Regs => commands::regs(),
    }
}

/// Exit status for `err`: the engine's code when it carries one.
fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(e) = err.downcast_ref::<SteerError>() {
        return e.code() as u8;
    }
    if err.downcast_ref::<LoadError>().is_some() {
        return 2;
    }
    1
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}
