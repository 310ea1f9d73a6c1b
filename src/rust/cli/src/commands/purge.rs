//! Purge command - delete every row of the given tables

use anyhow::{bail, Result};
use clap::Args;

use pipdb_core::admin;

use super::{open_database, open_tables};
use crate::config::Context;
use crate::output;

/// Purge command arguments
#[derive(Args)]
pub struct PurgeArgs {
    /// Tables to purge (comma-separated URIs or names)
    #[arg(short, long, value_delimiter = ',')]
    tables: Vec<String>,

    /// Confirm deleting every row
    #[arg(long)]
    yes: bool,
}

/// Execute purge command
pub async fn execute(ctx: &Context, args: PurgeArgs) -> Result<()> {
    if !args.yes {
        bail!("purge deletes every row; re-run with --yes to confirm");
    }

    let db = open_database(ctx).await?;
    let tables = open_tables(ctx, &db, &args.tables).await?;
    let removed = admin::purge_tables(&db, &tables).await;
    db.close().await;

    output::success(format!("Purged {} rows from {} tables", removed?, tables.len()));
    Ok(())
}
