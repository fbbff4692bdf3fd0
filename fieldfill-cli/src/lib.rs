//! fieldfill CLI library.
//!
//! Types and command handlers behind the `fieldfill` binary. The binary
//! parses arguments, installs tracing and calls [`run`].

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod output;

use cli::{Cli, Commands};

/// Dispatch a parsed [`Cli`] to the appropriate command handler.
pub async fn run(cli: Cli) -> error::CliResult<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Init { force } => commands::init::run(force),

        Commands::Scan {
            table,
            show,
            format,
        } => commands::scan::run(&table, show, format, config_path).await,

        Commands::Run { table, run, format } => {
            commands::run::run(&table, &run, format, config_path, cli.quiet).await
        }
    }
}
