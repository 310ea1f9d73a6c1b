//! Point-in-polygon query execution.
//!
//! A query runs in three stages: a bounding-box pre-filter produces candidate
//! ids, one inflation task per candidate loads the document, checks exact
//! containment and applies filters, and surviving places are emitted on a
//! channel. Inflation tasks run in a `JoinSet` whose width is bounded by a
//! semaphore and which shares a cancellation token with the query.

use std::sync::Arc;

use geo_types::Point;
use serde::Serialize;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::document::Document;
use crate::error::{SpatialError, SpatialResult};
use crate::filter::Filter;
use crate::geometry::{self, BBox};
use crate::spr::StandardPlaceResult;

use super::SpatialDatabase;

/// One event on a streaming query.
#[derive(Debug)]
pub enum QueryEvent {
    /// A place containing the point that passed every filter.
    Result(StandardPlaceResult),
    /// A query-level failure; no further results follow.
    Error(SpatialError),
    /// The query finished: every started inflation task has completed.
    Done(QuerySummary),
}

/// Task accounting for a finished query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QuerySummary {
    /// Candidates returned by the bounding-box pre-filter
    pub candidates: usize,
    /// Inflation tasks started
    pub started: usize,
    /// Inflation tasks that ran to completion
    pub completed: usize,
    /// Places emitted
    pub emitted: usize,
}

/// A pre-filter candidate: the record id and its stored bounding box.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub id: i64,
    pub bbox: BBox,
}

type Filters = Arc<[Arc<dyn Filter>]>;

/// Run a query, sending events to `events`. Always ends with [`QueryEvent::Done`]
/// unless the receiver has gone away.
pub(crate) async fn dispatch(
    spatial: SpatialDatabase,
    point: Point<f64>,
    filters: Filters,
    cancel: CancellationToken,
    events: mpsc::Sender<QueryEvent>,
) {
    let mut summary = QuerySummary::default();

    if cancel.is_cancelled() {
        let _ = events.send(QueryEvent::Error(SpatialError::Cancelled)).await;
        let _ = events.send(QueryEvent::Done(summary)).await;
        return;
    }

    let candidates = match spatial.candidate_ids(point).await {
        Ok(ids) => ids,
        Err(e) => {
            let _ = events.send(QueryEvent::Error(e)).await;
            let _ = events.send(QueryEvent::Done(summary)).await;
            return;
        }
    };
    summary.candidates = candidates.len();
    debug!(
        "Point ({}, {}) has {} bounding-box candidates",
        point.x(),
        point.y(),
        candidates.len()
    );

    // Cancelling the child stops siblings after a query-level failure
    // without touching the caller's token.
    let siblings = cancel.child_token();
    let semaphore = Arc::new(Semaphore::new(spatial.max_concurrent_inflations()));
    let mut tasks: JoinSet<SpatialResult<bool>> = JoinSet::new();

    for id in candidates {
        if events.is_closed() {
            debug!("Receiver dropped, not starting further inflations");
            break;
        }

        let permit = tokio::select! {
            biased;
            _ = siblings.cancelled() => break,
            permit = semaphore.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let spatial = spatial.clone();
        let filters = filters.clone();
        let token = siblings.clone();
        let events = events.clone();
        summary.started += 1;

        tasks.spawn(async move {
            let _permit = permit;
            let result = inflate(&spatial, id, point, &filters, &token, &events).await;
            if result.is_err() {
                // Stop the spawn loop and siblings before the permit is released.
                token.cancel();
            }
            result
        });
    }

    let mut failed = false;
    while let Some(joined) = tasks.join_next().await {
        summary.completed += 1;
        match joined {
            Ok(Ok(true)) => summary.emitted += 1,
            Ok(Ok(false)) => {}
            Ok(Err(e)) => {
                siblings.cancel();
                if !failed {
                    failed = true;
                    let _ = events.send(QueryEvent::Error(e)).await;
                }
            }
            Err(e) => warn!("Inflation task did not complete cleanly: {}", e),
        }
    }

    if !failed && cancel.is_cancelled() {
        let _ = events.send(QueryEvent::Error(SpatialError::Cancelled)).await;
    }

    debug!(
        "Query finished: {} candidates, {} started, {} completed, {} emitted",
        summary.candidates, summary.started, summary.completed, summary.emitted
    );
    let _ = events.send(QueryEvent::Done(summary)).await;
}

/// Inflate one candidate. Returns whether a place was emitted.
///
/// Missing or malformed documents, points outside the exact geometry and
/// filter rejections drop the candidate. Storage failures are returned and
/// fail the query.
async fn inflate(
    spatial: &SpatialDatabase,
    id: i64,
    point: Point<f64>,
    filters: &[Arc<dyn Filter>],
    cancel: &CancellationToken,
    events: &mpsc::Sender<QueryEvent>,
) -> SpatialResult<bool> {
    if cancel.is_cancelled() {
        return Ok(false);
    }

    let body = match spatial.load_document(id).await {
        Ok(body) => body,
        Err(e) if e.is_storage() => return Err(e),
        Err(e) => {
            warn!("Dropping candidate {}: {}", id, e);
            return Ok(false);
        }
    };

    let doc = match Document::parse(&body) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Dropping candidate {}: {}", id, e);
            return Ok(false);
        }
    };

    let geom = match doc.geometry() {
        Ok(geom) => geom,
        Err(e) => {
            warn!("Dropping candidate {}: {}", id, e);
            return Ok(false);
        }
    };

    if !geometry::contains_point(&geom, point.x(), point.y()) {
        trace!("Candidate {} does not contain the point", id);
        return Ok(false);
    }

    let place = match doc.centroid(&geom) {
        Ok(centroid) => {
            let bbox = BBox::from_geometry(&geom)
                .unwrap_or_else(|| BBox::new(centroid.x(), centroid.y(), centroid.x(), centroid.y()));
            StandardPlaceResult::with_geometry(&doc, centroid.x(), centroid.y(), bbox)
        }
        Err(e) => {
            warn!("Dropping candidate {}: {}", id, e);
            return Ok(false);
        }
    };

    for filter in filters {
        if let Err(rejection) = filter.apply(&place).await {
            debug!("Candidate {} {}", id, rejection);
            return Ok(false);
        }
    }

    if cancel.is_cancelled() {
        return Ok(false);
    }

    Ok(events.send(QueryEvent::Result(place)).await.is_ok())
}
