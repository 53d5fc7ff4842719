//! modsrc CLI - resolve module sources and stage archives into an in-memory
//! filesystem.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    logging::set_up_logging(cli.verbose);
    let formatter = output::create_formatter(cli.json, cli.verbose, cli.quiet);

    match &cli.command {
        cli::Commands::Resolve(args) => commands::resolve::execute(args, &*formatter).await,
        cli::Commands::Unpack(args) => commands::unpack::execute(args, &*formatter),
        cli::Commands::Completion { shell } => {
            commands::completion::execute(*shell);
            Ok(())
        }
    }
}
