//! Index command - bulk-load document files into tables

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use pipdb_core::{index_paths, AltPolicy, IndexOptions};

use super::{cancel_on_ctrl_c, open_database, open_tables};
use crate::config::{Context, OutputFormat};
use crate::output;

/// Index command arguments
#[derive(Args)]
pub struct IndexArgs {
    /// Files or directories containing .geojson documents
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Tables to index into (comma-separated URIs or names)
    #[arg(short, long, value_delimiter = ',')]
    tables: Vec<String>,

    /// Concurrent file readers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Only index alternate geometries
    #[arg(long, conflicts_with = "exclude_alternates")]
    alternates_only: bool,

    /// Skip alternate geometries
    #[arg(long)]
    exclude_alternates: bool,

    /// Report time spent per table
    #[arg(long)]
    timings: bool,
}

#[derive(Serialize, Tabled)]
struct TimingRow {
    #[tabled(rename = "Table")]
    table: String,
    #[tabled(rename = "Time")]
    time: String,
}

/// Execute index command
pub async fn execute(ctx: &Context, args: IndexArgs) -> Result<()> {
    let db = open_database(ctx).await?;
    let tables = open_tables(ctx, &db, &args.tables).await?;

    let mut options = IndexOptions::new(tables);
    options.workers = args.workers.unwrap_or(ctx.config.ingest.workers);
    options.alternates = AltPolicy::from_flags(args.alternates_only, args.exclude_alternates)?;
    options.timings = args.timings || ctx.config.ingest.timings;

    let cancel = cancel_on_ctrl_c();
    let report = index_paths(db.clone(), &args.paths, &options, &cancel).await;
    db.close().await;
    let report = report?;

    if ctx.format == OutputFormat::Json {
        output::print_json(&report);
    } else {
        output::success(format!(
            "Indexed {} documents ({} skipped, {} failed) in {}",
            report.indexed,
            report.skipped,
            report.failed.len(),
            output::format_elapsed(report.elapsed)
        ));

        if options.timings {
            let rows: Vec<TimingRow> = report
                .table_timings
                .iter()
                .map(|(table, elapsed)| TimingRow {
                    table: table.clone(),
                    time: output::format_elapsed(*elapsed),
                })
                .collect();
            output::section("Timings");
            output::print_data(&rows, ctx.format);
        }

        for failure in &report.failed {
            output::warning(format!("{}: {}", failure.path, failure.error));
        }
    }

    if !report.is_success() {
        bail!("{} documents could not be indexed", report.failed.len());
    }
    Ok(())
}
