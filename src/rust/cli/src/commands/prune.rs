//! Prune command - delete individual records from the given tables

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;

use pipdb_core::admin;

use super::{open_database, open_tables};
use crate::config::Context;
use crate::output;

/// Prune command arguments
#[derive(Args)]
pub struct PruneArgs {
    /// Files or directories whose documents name the records to prune
    paths: Vec<PathBuf>,

    /// Record ids to prune (repeatable)
    #[arg(long = "id")]
    ids: Vec<i64>,

    /// Tables to prune (comma-separated URIs or names)
    #[arg(short, long, value_delimiter = ',')]
    tables: Vec<String>,
}

/// Execute prune command
pub async fn execute(ctx: &Context, args: PruneArgs) -> Result<()> {
    if args.paths.is_empty() && args.ids.is_empty() {
        bail!("nothing to prune: pass paths or --id");
    }

    let mut ids = args.ids.clone();
    if !args.paths.is_empty() {
        ids.extend(admin::ids_from_paths(&args.paths)?);
    }
    ids.sort_unstable();
    ids.dedup();

    let db = open_database(ctx).await?;
    let tables = open_tables(ctx, &db, &args.tables).await?;
    let pruned = admin::prune_tables(&db, &tables, &ids).await;
    db.close().await;

    output::success(format!("Pruned {} of {} records", pruned?, ids.len()));
    Ok(())
}
