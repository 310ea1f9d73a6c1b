//! pipdb - point-in-polygon database CLI
//!
//! Index place documents into SQLite, ask which places contain a point, and
//! maintain the tables afterwards.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use pipdb_core::{initialize_logging, LoggingConfig};

mod commands;
mod config;
mod output;

/// Point-in-polygon database for place records
#[derive(Parser)]
#[command(name = "pipdb")]
#[command(author, version, about = "Point-in-polygon database for place records", long_about = None)]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Output format (table, json, plain)
    #[arg(long, global = true, default_value = "table")]
    format: String,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// YAML configuration file
    #[arg(long, global = true, env = "PIPDB_CONFIG")]
    config: Option<PathBuf>,

    /// Database URI (e.g. sqlite://?dsn=places.db)
    #[arg(long, global = true, env = "PIPDB_DATABASE_URI")]
    database_uri: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// CLI commands
#[derive(Subcommand)]
enum Commands {
    // =========================================================================
    // Indexing
    // =========================================================================
    /// Index .geojson documents from files or directories
    Index(commands::index::IndexArgs),

    // =========================================================================
    // Queries
    // =========================================================================
    /// Places containing a point
    Pip(commands::pip::PipArgs),

    /// Print a stored document by record URI
    Read(commands::read::ReadArgs),

    // =========================================================================
    // Maintenance
    // =========================================================================
    /// Remove records by id from every spatial table
    Remove(commands::remove::RemoveArgs),

    /// Delete every row of the given tables
    Purge(commands::purge::PurgeArgs),

    /// Delete the records named by files or ids from the given tables
    Prune(commands::prune::PruneArgs),

    /// List the table kinds documents can be indexed into
    Tables(commands::tables::TablesArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let ctx = match config::Context::resolve(cli.config.as_deref(), cli.database_uri, &cli.format) {
        Ok(ctx) => ctx,
        Err(e) => {
            output::error(format!("{:#}", e));
            std::process::exit(1);
        }
    };

    let logging = if cli.verbose > 0 {
        LoggingConfig::from_verbosity(cli.verbose)
    } else {
        LoggingConfig::from_settings(&ctx.config.logging)
    };
    initialize_logging(logging)?;

    let result = match cli.command {
        Commands::Index(args) => commands::index::execute(&ctx, args).await,
        Commands::Pip(args) => commands::pip::execute(&ctx, args).await,
        Commands::Read(args) => commands::read::execute(&ctx, args).await,
        Commands::Remove(args) => commands::remove::execute(&ctx, args).await,
        Commands::Purge(args) => commands::purge::execute(&ctx, args).await,
        Commands::Prune(args) => commands::prune::execute(&ctx, args).await,
        Commands::Tables(args) => commands::tables::execute(&ctx, args).await,
    };

    if let Err(e) = result {
        output::error(format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
