//! Minimal command-line driver for the memory crates: journal, cache,
//! lineage, and decision operations (spec §6 external interfaces).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod output;

use commands::cache::CacheCommands;
use commands::decision::DecisionCommands;
use commands::journal::JournalCommands;
use commands::lineage::LineageCommands;
use config::{load_memory_config, StoragePaths};
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "sunwell-memory")]
#[command(about = "Command-line driver for the memory journal, cache, lineage, and decision stores")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file path.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Project name, used to resolve the storage root.
    #[arg(short, long, default_value = "default")]
    project: String,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Human)]
    format: OutputFormat,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append to and tail the learning journal.
    Journal {
        #[command(subcommand)]
        command: JournalCommands,
    },
    /// Rebuild and query the derived SQLite read cache.
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
    /// Inspect and mutate artifact lineage.
    Lineage {
        #[command(subcommand)]
        command: LineageCommands,
    },
    /// Record and query architectural decisions.
    Decision {
        #[command(subcommand)]
        command: DecisionCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    let config = load_memory_config(cli.config.as_deref())?;
    let paths = StoragePaths::resolve(&config, &cli.project);

    match cli.command {
        Commands::Journal { command } => commands::journal::handle(command, &paths.journal, cli.format),
        Commands::Cache { command } => {
            commands::cache::handle(command, &paths.journal, &paths.cache, cli.format).await
        }
        Commands::Lineage { command } => {
            commands::lineage::handle(command, &paths.lineage, cli.format).await
        }
        Commands::Decision { command } => commands::decision::handle(
            command,
            &paths.decisions,
            config.mutually_exclusive_pairs.clone(),
            cli.format,
        ),
    }
}
