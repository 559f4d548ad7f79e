//! TechMetrics CLI
//!
//! Entry point for the scheduled job. With no subcommand it runs one
//! consolidated refresh and exits non-zero if the refresh failed.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "techmetrics")]
#[command(about = "TechMetrics - consolidated library popularity metrics", long_about = None)]
struct Cli {
    /// Config file (defaults to $TECHMETRICS_CONFIG, then ./config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Store database, overriding the configured path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Rebuild the published table from snapshot history (default)
    Refresh,
    /// Append a batch of extracted snapshots
    Ingest(commands::ingest::IngestArgs),
    /// Print the published table as JSON lines
    Show,
}

fn main() {
    let cli = Cli::parse();

    let result = commands::Session::open(cli.config.as_deref(), cli.db.as_deref()).and_then(
        |session| match cli.command.unwrap_or(Commands::Refresh) {
            Commands::Refresh => commands::refresh::execute(session),
            Commands::Ingest(args) => commands::ingest::execute(session, args),
            Commands::Show => commands::show::execute(session),
        },
    );

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
