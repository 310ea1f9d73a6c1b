//! Remove command - delete records from the spatial tables

use anyhow::Result;
use clap::Args;

use super::open_spatial;
use crate::config::Context;
use crate::output;

/// Remove command arguments
#[derive(Args)]
pub struct RemoveArgs {
    /// Record ids
    #[arg(required = true)]
    ids: Vec<i64>,
}

/// Execute remove command
pub async fn execute(ctx: &Context, args: RemoveArgs) -> Result<()> {
    let spatial = open_spatial(ctx).await?;
    let mut result = Ok(());
    for id in &args.ids {
        if let Err(e) = spatial.remove_feature(*id).await {
            result = Err(e);
            break;
        }
        output::success(format!("Removed record {}", id));
    }
    spatial.disconnect().await;
    Ok(result?)
}
