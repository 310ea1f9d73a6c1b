//! CLI command modules
//!
//! Every command opens the database named by the resolved configuration,
//! runs, and closes it again.

pub mod index;
pub mod pip;
pub mod prune;
pub mod purge;
pub mod read;
pub mod remove;
pub mod tables;

use std::sync::Arc;

use anyhow::{Context as _, Result};
use tokio_util::sync::CancellationToken;

use pipdb_core::tables::Table;
use pipdb_core::{SpatialDatabase, SqlDatabase, TableRegistry};

use crate::config::Context;
use crate::output;

/// Open the configured database.
pub async fn open_database(ctx: &Context) -> Result<Arc<SqlDatabase>> {
    let db = SqlDatabase::from_uri(&ctx.config.database_uri, &ctx.config.pool)
        .await
        .with_context(|| format!("failed to open {}", ctx.config.database_uri))?;
    if db.is_memory() {
        output::warning("Using an in-memory database; nothing will persist after this command");
    }
    Ok(Arc::new(db))
}

/// Open the configured database as a spatial database.
pub async fn open_spatial(ctx: &Context) -> Result<SpatialDatabase> {
    let db = open_database(ctx).await?;
    let spatial = SpatialDatabase::with_database(db, ctx.config.query.clone())
        .await
        .context("failed to initialize spatial tables")?;
    Ok(spatial)
}

/// Build and create tables from `--tables`, falling back to the configured list.
pub async fn open_tables(ctx: &Context, db: &SqlDatabase, requested: &[String]) -> Result<Vec<Arc<dyn Table>>> {
    let uris = if requested.is_empty() {
        ctx.config.ingest.tables.clone()
    } else {
        requested.to_vec()
    };
    let tables = TableRegistry::with_defaults()
        .new_tables_with_database(&uris, db)
        .await
        .context("failed to initialize tables")?;
    Ok(tables)
}

/// A token cancelled on Ctrl-C.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            output::warning("Interrupted, cancelling");
            child.cancel();
        }
    });
    token
}
