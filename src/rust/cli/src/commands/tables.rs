//! Tables command - list the table kinds documents can be indexed into

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use pipdb_core::TableRegistry;

use crate::config::Context;
use crate::output;

/// Tables command arguments
#[derive(Args)]
pub struct TablesArgs {}

#[derive(Serialize, Tabled)]
struct TableRow {
    #[tabled(rename = "Scheme")]
    scheme: String,
    #[tabled(rename = "ID column")]
    id_column: String,
    #[tabled(rename = "Alternates")]
    alternates: bool,
    #[tabled(rename = "Configured")]
    configured: bool,
}

/// Execute tables command
pub async fn execute(ctx: &Context, _args: TablesArgs) -> Result<()> {
    let registry = TableRegistry::with_defaults();
    let mut rows = Vec::new();
    for scheme in registry.schemes() {
        let table = registry.new_table(&scheme)?;
        rows.push(TableRow {
            configured: ctx.config.ingest.tables.iter().any(|t| t.split("://").next() == Some(scheme.as_str())),
            scheme: format!("{}://", scheme),
            id_column: table.id_column().to_string(),
            alternates: table.supports_alternate_geometries(),
        });
    }
    output::print_data(&rows, ctx.format);
    Ok(())
}
