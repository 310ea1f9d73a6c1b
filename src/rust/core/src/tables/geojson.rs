//! Document table: the raw bytes of every record, keyed by id and alternate label.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Sqlite, Transaction};
use tracing::debug;

use pipdb_common::constants::TABLE_GEOJSON;
use pipdb_common::schema::sqlite::geojson as gj;
use pipdb_common::schema::{column_list, placeholders};

use super::{table_name, Table};
use crate::document::Document;
use crate::error::{SpatialError, SpatialResult};
use crate::uri::{AltGeom, ResourceUri};

#[derive(Debug, Clone)]
pub struct GeoJsonTable {
    name: String,
}

impl GeoJsonTable {
    pub fn new() -> Self {
        Self {
            name: TABLE_GEOJSON.to_string(),
        }
    }

    pub fn from_uri(uri: &ResourceUri) -> Self {
        Self {
            name: table_name(uri, TABLE_GEOJSON),
        }
    }
}

impl Default for GeoJsonTable {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn factory(uri: &ResourceUri) -> SpatialResult<Arc<dyn Table>> {
    Ok(Arc::new(GeoJsonTable::from_uri(uri)))
}

#[async_trait]
impl Table for GeoJsonTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> String {
        format!(
            r#"CREATE TABLE IF NOT EXISTS {t} (
    id INTEGER NOT NULL,
    alt TEXT NOT NULL DEFAULT '',
    body TEXT NOT NULL,
    lastmodified INTEGER NOT NULL,
    PRIMARY KEY (id, alt)
);
CREATE INDEX IF NOT EXISTS {t}_lastmodified ON {t} (lastmodified)"#,
            t = self.name
        )
    }

    fn supports_alternate_geometries(&self) -> bool {
        true
    }

    async fn index_feature(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        body: &[u8],
        alt: Option<&AltGeom>,
    ) -> SpatialResult<()> {
        let text = std::str::from_utf8(body)
            .map_err(|e| SpatialError::validation(format!("document is not UTF-8: {}", e)))?;
        let doc = Document::parse(body)?;
        let alt_label = alt.map(|a| a.to_string()).unwrap_or_default();

        let sql = format!(
            "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
            self.name,
            column_list(gj::ALL_COLUMNS),
            placeholders(gj::ALL_COLUMNS.len())
        );

        sqlx::query(&sql)
            .bind(doc.id())
            .bind(&alt_label)
            .bind(text)
            .bind(doc.last_modified())
            .execute(&mut **tx)
            .await?;

        debug!("Stored document {} (alt '{}') in {} table", doc.id(), alt_label, self.name);
        Ok(())
    }
}
