//! Document reader and writer seams.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::config::PoolSettings;
use crate::database::{DatabaseRegistry, SqlDatabase};
use crate::error::{SpatialError, SpatialResult};
use crate::tables::{Table, TableRegistry};
use crate::uri::{parse_record_uri, ResourceUri};

/// Reads raw document bodies by URI.
#[async_trait]
pub trait DocumentReader: Send + Sync {
    async fn read(&self, uri: &str) -> SpatialResult<Vec<u8>>;
}

/// Writes raw document bodies; returns the number of bytes accepted.
#[async_trait]
pub trait DocumentWriter: Send + Sync {
    async fn write(&self, key: &str, body: &[u8]) -> SpatialResult<u64>;

    async fn flush(&self) -> SpatialResult<()> {
        Ok(())
    }

    async fn close(&self) -> SpatialResult<()> {
        Ok(())
    }
}

/// Writes documents into a set of tables through the atomic indexing protocol.
#[derive(Debug, Clone)]
pub struct TableWriter {
    db: Arc<SqlDatabase>,
    tables: Vec<Arc<dyn Table>>,
}

impl TableWriter {
    pub fn new(db: Arc<SqlDatabase>, tables: Vec<Arc<dyn Table>>) -> Self {
        Self { db, tables }
    }

    /// Open a writer from a database URI whose query names the tables to
    /// write, e.g. `sqlite://?dsn=places.db&whosonfirst=1&geojson=1`.
    /// A table flag of `0` or `false` leaves that table out.
    pub async fn from_uri(uri: &str, settings: &PoolSettings) -> SpatialResult<Self> {
        let parsed = ResourceUri::parse(uri)?;
        let registry = TableRegistry::with_defaults();
        let schemes: Vec<String> = registry
            .schemes()
            .into_iter()
            .filter(|scheme| {
                parsed
                    .get(scheme)
                    .map(|flag| !matches!(flag, "" | "0" | "false"))
                    .unwrap_or(false)
            })
            .collect();

        if schemes.is_empty() {
            return Err(SpatialError::Config(format!(
                "writer URI '{}' names no tables (expected one of {})",
                uri,
                registry.schemes().join(", ")
            )));
        }

        let db = Arc::new(DatabaseRegistry::with_defaults().open(uri, settings).await?);
        let tables = registry.new_tables_with_database(&schemes, &db).await?;
        debug!("Writer on {} for tables {}", db.dsn(), schemes.join(", "));
        Ok(Self::new(db, tables))
    }

    pub fn database(&self) -> &Arc<SqlDatabase> {
        &self.db
    }

    pub fn tables(&self) -> &[Arc<dyn Table>] {
        &self.tables
    }
}

#[async_trait]
impl DocumentWriter for TableWriter {
    /// The key is parsed as a record URI for its alternate label; keys that
    /// are not record URIs index the primary geometry.
    async fn write(&self, key: &str, body: &[u8]) -> SpatialResult<u64> {
        let alt = parse_record_uri(key).ok().and_then(|r| r.alt);
        let _guard = self.db.lock().await;
        self.db.index_feature(&self.tables, body, alt.as_ref()).await?;
        debug!("Wrote {} ({} bytes) to {} tables", key, body.len(), self.tables.len());
        Ok(body.len() as u64)
    }

    async fn close(&self) -> SpatialResult<()> {
        self.db.close().await;
        Ok(())
    }
}
