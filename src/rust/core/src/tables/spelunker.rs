//! Summary-document table: one prepared JSON document per record and
//! alternate label, for browsing without geometry.
//!
//! The prepared document holds every document property plus the derived
//! standard place fields (path, centroid, bounding box, existential flags).
//! Derived fields win over raw properties of the same name. Geometry is
//! left out.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{Sqlite, Transaction};
use tracing::debug;

use pipdb_common::constants::TABLE_SPELUNKER;
use pipdb_common::schema::sqlite::spelunker as sp;
use pipdb_common::schema::{column_list, placeholders};

use super::{table_name, Table};
use crate::document::Document;
use crate::error::{SpatialError, SpatialResult};
use crate::spr::StandardPlaceResult;
use crate::uri::{AltGeom, ResourceUri};

#[derive(Debug, Clone)]
pub struct SpelunkerTable {
    name: String,
}

impl SpelunkerTable {
    pub fn new() -> Self {
        Self {
            name: TABLE_SPELUNKER.to_string(),
        }
    }

    pub fn from_uri(uri: &ResourceUri) -> Self {
        Self {
            name: table_name(uri, TABLE_SPELUNKER),
        }
    }
}

impl Default for SpelunkerTable {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn factory(uri: &ResourceUri) -> SpatialResult<Arc<dyn Table>> {
    Ok(Arc::new(SpelunkerTable::from_uri(uri)))
}

/// Build the summary document stored for `doc`.
pub fn prepare_document(doc: &Document, alt: Option<&AltGeom>) -> SpatialResult<Value> {
    let place = StandardPlaceResult::from_document(doc)?;

    let mut summary = match serde_json::to_value(&place)? {
        Value::Object(fields) => fields,
        other => {
            return Err(SpatialError::validation(format!(
                "place summary is not an object: {}",
                other
            )))
        }
    };

    let mut merged: Map<String, Value> = doc.properties().clone();
    merged.append(&mut summary);

    if let Some(alt) = alt {
        merged.insert("src:alt_label".to_string(), Value::String(alt.to_string()));
    }

    Ok(Value::Object(merged))
}

#[async_trait]
impl Table for SpelunkerTable {
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
        let doc = Document::parse(body)?;
        let prepared = serde_json::to_string(&prepare_document(&doc, alt)?)?;
        let alt_label = alt.map(|a| a.to_string()).unwrap_or_default();

        let sql = format!(
            "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
            self.name,
            column_list(sp::ALL_COLUMNS),
            placeholders(sp::ALL_COLUMNS.len())
        );

        sqlx::query(&sql)
            .bind(doc.id())
            .bind(&alt_label)
            .bind(&prepared)
            .bind(doc.last_modified())
            .execute(&mut **tx)
            .await?;

        debug!("Stored summary of {} (alt '{}') in {} table", doc.id(), alt_label, self.name);
        Ok(())
    }
}
