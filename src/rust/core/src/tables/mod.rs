//! Tables: per-table projections of place documents.
//!
//! Each table derives its own row(s) from the raw document bytes and writes
//! them inside a transaction owned by [`SqlDatabase`]. Tables are created from
//! `scheme://` URIs through an explicit [`TableRegistry`].

pub mod geojson;
pub mod rtree;
pub mod spelunker;
pub mod whosonfirst;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Sqlite, Transaction};
use tracing::debug;

use pipdb_common::constants::{TABLE_GEOJSON, TABLE_RTREE, TABLE_SPELUNKER, TABLE_WHOSONFIRST};

use crate::database::SqlDatabase;
use crate::error::{SpatialError, SpatialResult};
use crate::uri::{AltGeom, ResourceUri};

pub use geojson::GeoJsonTable;
pub use rtree::RTreeTable;
pub use spelunker::SpelunkerTable;
pub use whosonfirst::WhosonfirstTable;

/// A projection of place documents into one SQL table.
#[async_trait]
pub trait Table: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// DDL creating the table and its indexes; statements separated by `;`.
    fn schema(&self) -> String;

    /// Column holding the record id; removal and pruning key on it.
    fn id_column(&self) -> &str {
        "id"
    }

    /// Whether alternate geometries get their own rows.
    fn supports_alternate_geometries(&self) -> bool;

    /// Create the table if it does not exist yet.
    async fn initialize_table(&self, db: &SqlDatabase) -> SpatialResult<()> {
        db.create_table_if_necessary(self.name(), &self.schema()).await
    }

    /// Derive this table's rows from `body` and write them inside `tx`.
    async fn index_feature(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        body: &[u8],
        alt: Option<&AltGeom>,
    ) -> SpatialResult<()>;
}

/// Builds a table from its resource URI.
pub type TableFactory = fn(&ResourceUri) -> SpatialResult<Arc<dyn Table>>;

/// Scheme to table factory lookup.
#[derive(Default)]
pub struct TableRegistry {
    factories: BTreeMap<String, TableFactory>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in tables registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        register_default_tables(&mut registry);
        registry
    }

    /// Register a factory. Registering a scheme twice is an error.
    pub fn register(&mut self, scheme: &str, factory: TableFactory) -> SpatialResult<()> {
        let scheme = scheme.to_lowercase();
        if self.factories.contains_key(&scheme) {
            return Err(SpatialError::Config(format!("table scheme '{}' already registered", scheme)));
        }
        debug!("Registered table scheme {}", scheme);
        self.factories.insert(scheme, factory);
        Ok(())
    }

    /// Registered schemes, sorted.
    pub fn schemes(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Build a table for a URI such as `geojson://` or a bare name such as `geojson`.
    pub fn new_table(&self, uri: &str) -> SpatialResult<Arc<dyn Table>> {
        let uri = if uri.contains("://") {
            uri.to_string()
        } else {
            format!("{}://", uri)
        };
        let parsed = ResourceUri::parse(&uri)?;
        let factory = self
            .factories
            .get(&parsed.scheme)
            .ok_or_else(|| SpatialError::UnknownScheme(parsed.scheme.clone()))?;
        factory(&parsed)
    }

    /// Build a table and create it in `db`.
    pub async fn new_table_with_database(&self, uri: &str, db: &SqlDatabase) -> SpatialResult<Arc<dyn Table>> {
        let table = self.new_table(uri)?;
        table.initialize_table(db).await?;
        Ok(table)
    }

    /// Build and create every table in `uris`, preserving order.
    pub async fn new_tables_with_database(&self, uris: &[String], db: &SqlDatabase) -> SpatialResult<Vec<Arc<dyn Table>>> {
        let mut tables = Vec::with_capacity(uris.len());
        for uri in uris {
            tables.push(self.new_table_with_database(uri, db).await?);
        }
        Ok(tables)
    }
}

impl fmt::Debug for TableRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}

/// Register `whosonfirst://`, `geojson://`, `rtree://` and `spelunker://`.
pub fn register_default_tables(registry: &mut TableRegistry) {
    let defaults: [(&str, TableFactory); 4] = [
        (TABLE_WHOSONFIRST, whosonfirst::factory),
        (TABLE_GEOJSON, geojson::factory),
        (TABLE_RTREE, rtree::factory),
        (TABLE_SPELUNKER, spelunker::factory),
    ];
    for (scheme, factory) in defaults {
        // Fresh registries cannot collide on the built-ins.
        let _ = registry.register(scheme, factory);
    }
}

/// Table name from a `?name=` query parameter, falling back to `default`.
pub(crate) fn table_name(uri: &ResourceUri, default: &str) -> String {
    uri.get("name")
        .filter(|n| !n.is_empty())
        .unwrap_or(default)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schemes() {
        let registry = TableRegistry::with_defaults();
        assert_eq!(registry.schemes(), vec!["geojson", "rtree", "spelunker", "whosonfirst"]);
    }

    #[test]
    fn test_new_table_by_uri_or_name() {
        let registry = TableRegistry::with_defaults();
        assert_eq!(registry.new_table("geojson://").unwrap().name(), "geojson");
        assert_eq!(registry.new_table("whosonfirst").unwrap().name(), "whosonfirst");
        assert_eq!(registry.new_table("rtree://?name=shapes").unwrap().name(), "shapes");
    }

    #[test]
    fn test_unknown_scheme() {
        let registry = TableRegistry::with_defaults();
        let err = registry.new_table("postgis://").unwrap_err();
        assert!(matches!(err, SpatialError::UnknownScheme(s) if s == "postgis"));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = TableRegistry::with_defaults();
        let result = registry.register("GeoJSON", geojson::factory);
        assert!(result.is_err());
    }

    #[test]
    fn test_id_columns() {
        let registry = TableRegistry::with_defaults();
        assert_eq!(registry.new_table("whosonfirst").unwrap().id_column(), "id");
        assert_eq!(registry.new_table("geojson").unwrap().id_column(), "id");
        assert_eq!(registry.new_table("rtree").unwrap().id_column(), "wof_id");
        assert_eq!(registry.new_table("spelunker").unwrap().id_column(), "id");
    }

    #[test]
    fn test_alternate_support() {
        let registry = TableRegistry::with_defaults();
        assert!(!registry.new_table("whosonfirst").unwrap().supports_alternate_geometries());
        assert!(registry.new_table("geojson").unwrap().supports_alternate_geometries());
        assert!(registry.new_table("rtree").unwrap().supports_alternate_geometries());
        assert!(registry.new_table("spelunker").unwrap().supports_alternate_geometries());
    }
}
