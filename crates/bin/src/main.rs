//! Tollgate command line: the demo web server, a health probe and user administration.

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

mod backend;
mod cli;
mod commands;
mod output;
mod templates;

use cli::{Cli, Commands};
use output::OutputFormat;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so `--json` output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tollgate=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let format = OutputFormat::from_flag(cli.json);
    match cli.command {
        Some(Commands::Serve(args)) => commands::serve::run(&args).await,
        Some(Commands::Health(args)) => commands::health::run(&args).await,
        Some(Commands::Users(command)) => commands::users::run(&command, format).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}
