//! Spatial database
//!
//! Combines a geometry table (bounding boxes and geometries) with a document
//! table (raw bodies) over one [`SqlDatabase`] and answers point-in-polygon
//! queries against them.

mod query;

pub use query::{Candidate, QueryEvent, QuerySummary};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use geo_types::Point;
use sqlx::Row;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use pipdb_common::constants::{TABLE_GEOJSON, TABLE_WHOSONFIRST};

use crate::cache::InflationCache;
use crate::config::{PoolSettings, QuerySettings, SpatialConfig};
use crate::database::SqlDatabase;
use crate::document::Document;
use crate::error::{SpatialError, SpatialResult};
use crate::filter::Filter;
use crate::geometry::BBox;
use crate::spr::StandardPlaceResult;
use crate::store::{DocumentReader, DocumentWriter};
use crate::tables::{Table, TableRegistry};
use crate::uri::{parse_record_uri, AltGeom};

struct Inner {
    db: Arc<SqlDatabase>,
    geometry_table: Arc<dyn Table>,
    document_table: Arc<dyn Table>,
    cache: InflationCache,
    settings: QuerySettings,
}

/// Point-in-polygon index over a geometry table and a document table.
///
/// Cheap to clone; clones share the database, tables and cache.
#[derive(Clone)]
pub struct SpatialDatabase {
    inner: Arc<Inner>,
}

impl SpatialDatabase {
    /// Open from a database URI with default pool and query settings.
    pub async fn from_uri(uri: &str) -> SpatialResult<Self> {
        let db = SqlDatabase::from_uri(uri, &PoolSettings::default()).await?;
        Self::with_database(Arc::new(db), QuerySettings::default()).await
    }

    /// Open the database named by `config` and apply its query settings.
    pub async fn from_config(config: &SpatialConfig) -> SpatialResult<Self> {
        let db = SqlDatabase::from_uri(&config.database_uri, &config.pool).await?;
        Self::with_database(Arc::new(db), config.query.clone()).await
    }

    /// Wrap an open database, creating the geometry and document tables.
    pub async fn with_database(db: Arc<SqlDatabase>, settings: QuerySettings) -> SpatialResult<Self> {
        settings.validate().map_err(SpatialError::Config)?;

        let registry = TableRegistry::with_defaults();
        let geometry_table = registry.new_table_with_database(TABLE_WHOSONFIRST, &db).await?;
        let document_table = registry.new_table_with_database(TABLE_GEOJSON, &db).await?;

        let cache = InflationCache::new(settings.cache_size, Duration::from_secs(settings.cache_ttl_secs));

        info!(
            "Spatial database ready on {} (max {} concurrent inflations, cache {})",
            db.dsn(),
            settings.max_concurrent_inflations,
            if cache.is_enabled() { "on" } else { "off" }
        );

        Ok(Self {
            inner: Arc::new(Inner {
                db,
                geometry_table,
                document_table,
                cache,
                settings,
            }),
        })
    }

    pub fn database(&self) -> &Arc<SqlDatabase> {
        &self.inner.db
    }

    /// The tables every document is indexed into, geometry table first.
    pub fn tables(&self) -> Vec<Arc<dyn Table>> {
        vec![self.inner.geometry_table.clone(), self.inner.document_table.clone()]
    }

    pub fn cache(&self) -> &InflationCache {
        &self.inner.cache
    }

    pub(crate) fn max_concurrent_inflations(&self) -> usize {
        self.inner.settings.max_concurrent_inflations
    }

    /// Index a document. An alternate label declared in the document
    /// (`src:alt_label`) is honored.
    pub async fn index_feature(&self, body: &[u8]) -> SpatialResult<()> {
        let alt = Document::parse(body)?
            .alt_label()
            .map(|label| AltGeom::parse(&label))
            .transpose()?;
        self.index_feature_with_alt(body, alt.as_ref()).await
    }

    /// Index a document as the given alternate geometry (`None` for the primary).
    pub async fn index_feature_with_alt(&self, body: &[u8], alt: Option<&AltGeom>) -> SpatialResult<()> {
        let id = Document::parse(body)?.id();
        let _guard = self.inner.db.lock().await;
        self.inner.db.index_feature(&self.tables(), body, alt).await?;
        self.inner.cache.invalidate(id);
        debug!("Indexed record {}", id);
        Ok(())
    }

    /// Remove a record, with all its alternates, from both tables.
    pub async fn remove_feature(&self, id: i64) -> SpatialResult<()> {
        let _guard = self.inner.db.lock().await;
        self.inner.db.remove_feature(&self.tables(), id).await?;
        self.inner.cache.invalidate(id);
        Ok(())
    }

    /// Delete every record and clear the cache.
    pub async fn purge(&self) -> SpatialResult<u64> {
        let _guard = self.inner.db.lock().await;
        let removed = self.inner.db.purge_tables(&self.tables()).await?;
        self.inner.cache.clear();
        Ok(removed)
    }

    /// Every place whose geometry contains `point` (longitude, latitude) and
    /// which passes every filter, in no particular order.
    ///
    /// Cancellation returns [`SpatialError::Cancelled`] and no partial results.
    pub async fn point_in_polygon(
        &self,
        point: Point<f64>,
        filters: &[Arc<dyn Filter>],
        cancel: &CancellationToken,
    ) -> SpatialResult<Vec<StandardPlaceResult>> {
        let mut events = self.point_in_polygon_stream(point, filters.to_vec(), cancel.clone());
        let mut results = Vec::new();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SpatialError::Cancelled),
                event = events.recv() => match event {
                    Some(QueryEvent::Result(place)) => results.push(place),
                    Some(QueryEvent::Error(e)) => return Err(e),
                    Some(QueryEvent::Done(_)) | None => break,
                },
            }
        }

        Ok(results)
    }

    /// Streaming variant of [`point_in_polygon`](Self::point_in_polygon).
    ///
    /// Places arrive as they are inflated. The stream ends with a
    /// [`QueryEvent::Done`]; a failure is reported as a [`QueryEvent::Error`]
    /// right before it. Dropping the receiver stops emission.
    pub fn point_in_polygon_stream(
        &self,
        point: Point<f64>,
        filters: Vec<Arc<dyn Filter>>,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<QueryEvent> {
        let (tx, rx) = mpsc::channel(self.inner.settings.channel_capacity);
        let spatial = self.clone();
        tokio::spawn(query::dispatch(spatial, point, filters.into(), cancel, tx));
        rx
    }

    /// Bounding-box candidates for `point`, without inflation.
    pub async fn point_in_polygon_candidates(&self, point: Point<f64>) -> SpatialResult<Vec<Candidate>> {
        let sql = format!(
            "SELECT id, min_x, min_y, max_x, max_y FROM {} \
             WHERE min_x <= ?1 AND max_x >= ?1 AND min_y <= ?2 AND max_y >= ?2 \
             ORDER BY id",
            self.inner.geometry_table.name()
        );
        let rows = sqlx::query(&sql)
            .bind(point.x())
            .bind(point.y())
            .fetch_all(self.inner.db.pool())
            .await?;

        rows.iter()
            .map(|row| -> SpatialResult<Candidate> {
                Ok(Candidate {
                    id: row.try_get("id")?,
                    bbox: BBox::new(
                        row.try_get("min_x")?,
                        row.try_get("min_y")?,
                        row.try_get("max_x")?,
                        row.try_get("max_y")?,
                    ),
                })
            })
            .collect()
    }

    pub(crate) async fn candidate_ids(&self, point: Point<f64>) -> SpatialResult<Vec<i64>> {
        let sql = format!(
            "SELECT id FROM {} WHERE min_x <= ?1 AND max_x >= ?1 AND min_y <= ?2 AND max_y >= ?2",
            self.inner.geometry_table.name()
        );
        let ids: Vec<i64> = sqlx::query_scalar(&sql)
            .bind(point.x())
            .bind(point.y())
            .fetch_all(self.inner.db.pool())
            .await?;
        Ok(ids)
    }

    /// Primary document body for `id`, through the cache.
    pub(crate) async fn load_document(&self, id: i64) -> SpatialResult<Arc<[u8]>> {
        if let Some(body) = self.inner.cache.get(id) {
            return Ok(body);
        }
        let seen = self.inner.cache.generation();
        let body: Arc<[u8]> = Arc::from(self.read_by_id(id, None).await?);
        if self.inner.cache.is_enabled() && !self.inner.cache.insert_if_unchanged(id, body.clone(), seen) {
            debug!("Not caching record {}: invalidated during read", id);
        }
        Ok(body)
    }

    /// Raw document body for a record id and optional alternate label.
    pub async fn read_by_id(&self, id: i64, alt: Option<&AltGeom>) -> SpatialResult<Vec<u8>> {
        let alt_label = alt.map(|a| a.to_string()).unwrap_or_default();
        let sql = format!(
            "SELECT body FROM {} WHERE id = ?1 AND alt = ?2",
            self.inner.document_table.name()
        );
        let body: Option<String> = sqlx::query_scalar(&sql)
            .bind(id)
            .bind(&alt_label)
            .fetch_optional(self.inner.db.pool())
            .await?;

        match body {
            Some(body) => Ok(body.into_bytes()),
            None if alt_label.is_empty() => Err(SpatialError::NotFound(format!("record {}", id))),
            None => Err(SpatialError::NotFound(format!("record {} alternate {}", id, alt_label))),
        }
    }

    /// Close the underlying pool.
    pub async fn disconnect(&self) {
        self.inner.cache.clear();
        self.inner.db.close().await;
    }
}

impl std::fmt::Debug for SpatialDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialDatabase")
            .field("dsn", &self.inner.db.dsn())
            .field("geometry_table", &self.inner.geometry_table.name())
            .field("document_table", &self.inner.document_table.name())
            .field("cache", &self.inner.cache)
            .finish()
    }
}

#[async_trait]
impl DocumentReader for SpatialDatabase {
    /// Read by record URI (`1234.geojson`, `1234-alt-source.geojson`) or bare id.
    async fn read(&self, uri: &str) -> SpatialResult<Vec<u8>> {
        let record = parse_record_uri(uri)?;
        self.read_by_id(record.id, record.alt.as_ref()).await
    }
}

#[async_trait]
impl DocumentWriter for SpatialDatabase {
    /// Index `body`; an alternate label in `key` takes precedence over one in the document.
    async fn write(&self, key: &str, body: &[u8]) -> SpatialResult<u64> {
        match parse_record_uri(key).ok().and_then(|r| r.alt) {
            Some(alt) => self.index_feature_with_alt(body, Some(&alt)).await?,
            None => self.index_feature(body).await?,
        }
        Ok(body.len() as u64)
    }

    async fn close(&self) -> SpatialResult<()> {
        self.disconnect().await;
        Ok(())
    }
}
