//! `swing-tracker` binary: detection runs plus config inspection.

mod cli;
mod commands;
mod error;
mod pipeline;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_info, run_pipeline, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is the normal case
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    observability::init_tracing(cli.log_format.into(), log_level(&cli))?;
    info!(version = env!("CARGO_PKG_VERSION"), command = cli.command.name(), "swing-tracker");

    let outcome = match &cli.command {
        Commands::Run(args) => run_pipeline(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    outcome.inspect_err(|e| tracing::error!(error = %e, "Command failed"))
}

/// Level from `-q` / `-v`; `RUST_LOG` still wins when set
fn log_level(cli: &Cli) -> &'static str {
    match (cli.quiet, cli.verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    }
}
