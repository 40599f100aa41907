//! azrest - A CLI for Azure Resource Manager, Key Vault and Azure OpenAI

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod banner;
mod cli;
mod commands;
mod output;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Handle dynamic shell completions (when invoked via COMPLETE=<shell> azrest)
    clap_complete::CompleteEnv::with_factory(Cli::command).complete();

    let cli = Cli::parse();

    let filter = if cli.verbose > 0 {
        match cli.verbose {
            1 => "azrest=debug,azrest_client=debug",
            _ => "azrest=trace,azrest_client=trace",
        }
    } else if cli.quiet {
        "error"
    } else {
        "azrest=info,azrest_client=info"
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time().with_writer(std::io::stderr))
        .with(EnvFilter::new(filter))
        .init();

    if cli.no_color {
        colored::control::set_override(false);
    }

    cli.run().await
}
