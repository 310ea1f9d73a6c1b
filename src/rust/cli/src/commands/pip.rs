//! Pip command - which places contain a point?

use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use pipdb_core::{Existential, Filter, PlaceFilter, Point, QueryEvent};

use super::{cancel_on_ctrl_c, open_spatial};
use crate::config::{Context, OutputFormat};
use crate::output;

/// Pip command arguments
#[derive(Args)]
pub struct PipArgs {
    /// Longitude of the point
    #[arg(long, visible_alias = "lon", allow_hyphen_values = true)]
    longitude: f64,

    /// Latitude of the point
    #[arg(long, visible_alias = "lat", allow_hyphen_values = true)]
    latitude: f64,

    /// Only these placetypes (repeatable)
    #[arg(long = "placetype")]
    placetypes: Vec<String>,

    /// Never these placetypes (repeatable)
    #[arg(long = "exclude-placetype")]
    exclude_placetypes: Vec<String>,

    /// Only places in these countries (repeatable)
    #[arg(long = "country")]
    countries: Vec<String>,

    /// Allowed is_current values: -1, 0 or 1 (repeatable)
    #[arg(long, allow_hyphen_values = true)]
    is_current: Vec<i64>,

    /// Allowed is_deprecated values (repeatable)
    #[arg(long, allow_hyphen_values = true)]
    is_deprecated: Vec<i64>,

    /// Allowed is_ceased values (repeatable)
    #[arg(long, allow_hyphen_values = true)]
    is_ceased: Vec<i64>,

    /// Allowed is_superseded values (repeatable)
    #[arg(long, allow_hyphen_values = true)]
    is_superseded: Vec<i64>,

    /// Allowed is_superseding values (repeatable)
    #[arg(long, allow_hyphen_values = true)]
    is_superseding: Vec<i64>,

    /// Only places last modified at or after this Unix timestamp (seconds)
    #[arg(long)]
    modified_since: Option<i64>,

    /// List bounding-box candidates without checking geometries
    #[arg(long, conflicts_with = "stream")]
    candidates: bool,

    /// Print places as they are found, one JSON object per line
    #[arg(long)]
    stream: bool,
}

#[derive(Serialize, Tabled)]
struct CandidateRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Min X")]
    min_x: f64,
    #[tabled(rename = "Min Y")]
    min_y: f64,
    #[tabled(rename = "Max X")]
    max_x: f64,
    #[tabled(rename = "Max Y")]
    max_y: f64,
}

impl PipArgs {
    fn point(&self) -> Result<Point<f64>> {
        if !(-180.0..=180.0).contains(&self.longitude) {
            bail!("longitude {} is out of range", self.longitude);
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            bail!("latitude {} is out of range", self.latitude);
        }
        Ok(Point::new(self.longitude, self.latitude))
    }

    fn filter(&self) -> Result<PlaceFilter> {
        Ok(PlaceFilter {
            placetypes: self.placetypes.clone(),
            exclude_placetypes: self.exclude_placetypes.clone(),
            countries: self.countries.clone(),
            is_current: existential(&self.is_current)?,
            is_deprecated: existential(&self.is_deprecated)?,
            is_ceased: existential(&self.is_ceased)?,
            is_superseded: existential(&self.is_superseded)?,
            is_superseding: existential(&self.is_superseding)?,
            modified_since: self.modified_since,
        })
    }
}

fn existential(values: &[i64]) -> Result<Vec<Existential>> {
    values
        .iter()
        .map(|v| match v {
            -1 | 0 | 1 => Ok(Existential::from_i64(*v)),
            other => bail!("existential flags are -1, 0 or 1, got {}", other),
        })
        .collect()
}

/// Execute pip command
pub async fn execute(ctx: &Context, args: PipArgs) -> Result<()> {
    let point = args.point()?;
    let spatial = open_spatial(ctx).await?;

    if args.candidates {
        let candidates = spatial.point_in_polygon_candidates(point).await;
        spatial.disconnect().await;
        let rows: Vec<CandidateRow> = candidates?
            .into_iter()
            .map(|c| CandidateRow {
                id: c.id,
                min_x: c.bbox.min_x,
                min_y: c.bbox.min_y,
                max_x: c.bbox.max_x,
                max_y: c.bbox.max_y,
            })
            .collect();
        output::print_data(&rows, ctx.format);
        return Ok(());
    }

    let filter = args.filter()?;
    let filters: Vec<Arc<dyn Filter>> = if filter.is_empty() {
        Vec::new()
    } else {
        vec![Arc::new(filter)]
    };
    let cancel = cancel_on_ctrl_c();

    if args.stream {
        let mut events = spatial.point_in_polygon_stream(point, filters, cancel);
        let mut failure = None;
        while let Some(event) = events.recv().await {
            match event {
                QueryEvent::Result(place) => println!("{}", serde_json::to_string(&place)?),
                QueryEvent::Error(e) => failure = Some(e),
                QueryEvent::Done(summary) => {
                    tracing::debug!(
                        "{} candidates, {} emitted",
                        summary.candidates,
                        summary.emitted
                    );
                }
            }
        }
        spatial.disconnect().await;
        if let Some(e) = failure {
            return Err(e.into());
        }
        return Ok(());
    }

    let places = spatial.point_in_polygon(point, &filters, &cancel).await;
    spatial.disconnect().await;
    let places = places?;

    output::print_places(&places, ctx.format);
    if ctx.format == OutputFormat::Table && !places.is_empty() {
        output::info(format!("{} places contain ({}, {})", places.len(), point.x(), point.y()));
    }
    Ok(())
}
