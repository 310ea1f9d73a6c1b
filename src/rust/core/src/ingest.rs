//! Bulk ingestion of document files into a set of tables.
//!
//! Files are discovered by walking the given paths, read concurrently, and
//! indexed one at a time through the atomic multi-table protocol while the
//! database write lock is held.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use pipdb_common::constants::DOCUMENT_EXTENSION;

use crate::database::{SqlDatabase, TableTiming};
use crate::document::Document;
use crate::error::{SpatialError, SpatialResult};
use crate::tables::Table;
use crate::uri::{parse_record_uri, AltGeom};

/// Which geometries an ingestion run indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AltPolicy {
    /// Primary and alternate geometries
    #[default]
    Include,
    /// Primary geometries only
    Exclude,
    /// Alternate geometries only
    Only,
}

impl AltPolicy {
    pub fn from_flags(alternates_only: bool, exclude_alternates: bool) -> SpatialResult<Self> {
        match (alternates_only, exclude_alternates) {
            (true, true) => Err(SpatialError::Config(
                "alternates_only and exclude_alternates are mutually exclusive".to_string(),
            )),
            (true, false) => Ok(Self::Only),
            (false, true) => Ok(Self::Exclude),
            (false, false) => Ok(Self::Include),
        }
    }

    fn accepts(&self, is_alternate: bool) -> bool {
        match self {
            Self::Include => true,
            Self::Exclude => !is_alternate,
            Self::Only => is_alternate,
        }
    }
}

/// Options for [`index_paths`].
#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub tables: Vec<Arc<dyn Table>>,
    pub workers: usize,
    pub alternates: AltPolicy,
    pub timings: bool,
}

impl IndexOptions {
    pub fn new(tables: Vec<Arc<dyn Table>>) -> Self {
        Self {
            tables,
            workers: 4,
            alternates: AltPolicy::default(),
            timings: false,
        }
    }
}

/// A document that could not be indexed.
#[derive(Debug, Clone, Serialize)]
pub struct IndexFailure {
    pub path: String,
    pub error: String,
}

/// Outcome of an ingestion run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexReport {
    pub indexed: usize,
    pub skipped: usize,
    pub failed: Vec<IndexFailure>,
    /// Cumulative time per table, when timings are enabled
    pub table_timings: BTreeMap<String, Duration>,
    pub elapsed: Duration,
}

impl IndexReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn add_timings(&mut self, timings: &[TableTiming]) {
        for t in timings {
            *self.table_timings.entry(t.table.clone()).or_default() += t.elapsed;
        }
    }
}

enum Outcome {
    Indexed(Vec<TableTiming>),
    Skipped,
    Failed(String),
}

/// Collect document files under `paths`, sorted for deterministic order.
pub fn collect_documents(paths: &[PathBuf]) -> SpatialResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for root in paths {
        if !root.exists() {
            return Err(SpatialError::NotFound(format!("path {}", root.display())));
        }
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry.map_err(|e| SpatialError::Io(e.into()))?;
            if entry.file_type().is_file() && is_document(entry.path()) {
                files.push(entry.into_path());
            }
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn is_document(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(DOCUMENT_EXTENSION)
}

/// Index every document under `paths` into `options.tables`.
///
/// Malformed documents are reported and skipped; a storage failure stops the
/// run and is returned.
pub async fn index_paths(
    db: Arc<SqlDatabase>,
    paths: &[PathBuf],
    options: &IndexOptions,
    cancel: &CancellationToken,
) -> SpatialResult<IndexReport> {
    let started = Instant::now();
    let files = collect_documents(paths)?;
    info!("Indexing {} documents into {} tables", files.len(), options.tables.len());

    let tables: Arc<[Arc<dyn Table>]> = options.tables.clone().into();
    let semaphore = Arc::new(Semaphore::new(options.workers.max(1)));
    let stop = cancel.child_token();
    let mut tasks: JoinSet<(PathBuf, SpatialResult<Outcome>)> = JoinSet::new();

    for path in files {
        let permit = tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            permit = semaphore.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let db = db.clone();
        let tables = tables.clone();
        let stop = stop.clone();
        let alternates = options.alternates;

        tasks.spawn(async move {
            let _permit = permit;
            let outcome = index_file(&db, &tables, &path, alternates, &stop).await;
            (path, outcome)
        });
    }

    let mut report = IndexReport::default();
    let mut fatal: Option<SpatialError> = None;

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(Outcome::Indexed(timings)))) => {
                report.indexed += 1;
                if options.timings {
                    report.add_timings(&timings);
                }
            }
            Ok((_, Ok(Outcome::Skipped))) => report.skipped += 1,
            Ok((path, Ok(Outcome::Failed(error)))) => {
                warn!("Failed to index {}: {}", path.display(), error);
                report.failed.push(IndexFailure {
                    path: path.display().to_string(),
                    error,
                });
            }
            Ok((path, Err(e))) => {
                stop.cancel();
                if fatal.is_none() {
                    warn!("Stopping ingestion at {}: {}", path.display(), e);
                    fatal = Some(e);
                }
            }
            Err(e) => warn!("Ingestion task did not complete cleanly: {}", e),
        }
    }

    if let Some(e) = fatal {
        return Err(e);
    }
    if cancel.is_cancelled() {
        return Err(SpatialError::Cancelled);
    }

    report.failed.sort_by(|a, b| a.path.cmp(&b.path));
    report.elapsed = started.elapsed();

    if options.timings {
        for (table, elapsed) in &report.table_timings {
            info!("Time spent indexing {} table: {:?}", table, elapsed);
        }
    }
    info!(
        "Indexed {} documents ({} skipped, {} failed) in {:?}",
        report.indexed,
        report.skipped,
        report.failed.len(),
        report.elapsed
    );
    Ok(report)
}

/// Index one file. Document-level problems come back as `Outcome::Failed`;
/// only storage failures are errors.
async fn index_file(
    db: &SqlDatabase,
    tables: &[Arc<dyn Table>],
    path: &Path,
    alternates: AltPolicy,
    cancel: &CancellationToken,
) -> SpatialResult<Outcome> {
    if cancel.is_cancelled() {
        return Ok(Outcome::Skipped);
    }

    let body = match tokio::fs::read(path).await {
        Ok(body) => body,
        Err(e) => return Ok(Outcome::Failed(format!("read failed: {}", e))),
    };

    let alt = match alternate_for(path, &body) {
        Ok(alt) => alt,
        Err(e) => return Ok(Outcome::Failed(e.to_string())),
    };

    if !alternates.accepts(alt.is_some()) {
        debug!("Skipping {} (alternate policy {:?})", path.display(), alternates);
        return Ok(Outcome::Skipped);
    }

    let _guard = db.lock().await;
    match db.index_feature_with_timings(tables, &body, alt.as_ref()).await {
        Ok(timings) => {
            debug!("Indexed {}", path.display());
            Ok(Outcome::Indexed(timings))
        }
        Err(e) if e.is_storage() => Err(e),
        Err(e) => Ok(Outcome::Failed(e.to_string())),
    }
}

/// Alternate label from the file name, falling back to `src:alt_label` in
/// the document when the file name is not a record URI.
fn alternate_for(path: &Path, body: &[u8]) -> SpatialResult<Option<AltGeom>> {
    let name = path.to_string_lossy();
    match parse_record_uri(&name) {
        Ok(record) => Ok(record.alt),
        Err(_) => Document::parse(body)?
            .alt_label()
            .map(|label| AltGeom::parse(&label))
            .transpose(),
    }
}
