//! Read command - print a stored document

use std::io::Write;

use anyhow::Result;
use clap::Args;

use pipdb_core::DocumentReader;

use super::open_spatial;
use crate::config::Context;

/// Read command arguments
#[derive(Args)]
pub struct ReadArgs {
    /// Record URI or id (e.g. 1234, 1234.geojson, 1234-alt-quattroshapes.geojson)
    uri: String,
}

/// Execute read command
pub async fn execute(ctx: &Context, args: ReadArgs) -> Result<()> {
    let spatial = open_spatial(ctx).await?;
    let body = spatial.read(&args.uri).await;
    spatial.disconnect().await;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&body?)?;
    writeln!(stdout)?;
    Ok(())
}
