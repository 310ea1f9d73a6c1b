//! Geometry table: one row per record holding the primary geometry, its
//! bounding box and the attributes point-in-polygon queries filter on.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Sqlite, Transaction};
use tracing::debug;

use pipdb_common::constants::TABLE_WHOSONFIRST;
use pipdb_common::schema::sqlite::whosonfirst as wof;
use pipdb_common::schema::{column_list, placeholders};

use super::{table_name, Table};
use crate::document::Document;
use crate::error::{SpatialError, SpatialResult};
use crate::geometry::{self, BBox};
use crate::uri::{AltGeom, ResourceUri};

#[derive(Debug, Clone)]
pub struct WhosonfirstTable {
    name: String,
}

impl WhosonfirstTable {
    pub fn new() -> Self {
        Self {
            name: TABLE_WHOSONFIRST.to_string(),
        }
    }

    pub fn from_uri(uri: &ResourceUri) -> Self {
        Self {
            name: table_name(uri, TABLE_WHOSONFIRST),
        }
    }
}

impl Default for WhosonfirstTable {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn factory(uri: &ResourceUri) -> SpatialResult<Arc<dyn Table>> {
    Ok(Arc::new(WhosonfirstTable::from_uri(uri)))
}

#[async_trait]
impl Table for WhosonfirstTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> String {
        format!(
            r#"CREATE TABLE IF NOT EXISTS {t} (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL DEFAULT '',
    country TEXT NOT NULL,
    placetype TEXT NOT NULL,
    parent_id INTEGER NOT NULL,
    is_current INTEGER NOT NULL,
    is_deprecated INTEGER NOT NULL,
    is_ceased INTEGER NOT NULL,
    geometry TEXT NOT NULL,
    centroid TEXT NOT NULL,
    min_x REAL NOT NULL,
    min_y REAL NOT NULL,
    max_x REAL NOT NULL,
    max_y REAL NOT NULL,
    properties TEXT NOT NULL,
    lastmodified INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS {t}_bbox ON {t} (min_x, max_x, min_y, max_y);
CREATE INDEX IF NOT EXISTS {t}_placetype ON {t} (placetype);
CREATE INDEX IF NOT EXISTS {t}_parent_id ON {t} (parent_id);
CREATE INDEX IF NOT EXISTS {t}_lastmodified ON {t} (lastmodified)"#,
            t = self.name
        )
    }

    fn supports_alternate_geometries(&self) -> bool {
        false
    }

    async fn index_feature(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        body: &[u8],
        alt: Option<&AltGeom>,
    ) -> SpatialResult<()> {
        if let Some(alt) = alt {
            debug!("Skipping alternate geometry {} for {} table", alt, self.name);
            return Ok(());
        }

        let doc = Document::parse(body)?;
        let geom = doc.geometry()?;
        let centroid = doc.centroid(&geom)?;
        let bbox = BBox::from_geometry(&geom).ok_or_else(|| {
            SpatialError::invalid_field("geometry", format!("record {} has an empty geometry", doc.id()))
        })?;

        let sql = format!(
            "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
            self.name,
            column_list(wof::ALL_COLUMNS),
            placeholders(wof::ALL_COLUMNS.len())
        );

        sqlx::query(&sql)
            .bind(doc.id())
            .bind(doc.name())
            .bind(doc.country())
            .bind(doc.placetype())
            .bind(doc.parent_id())
            .bind(doc.is_current().as_i8())
            .bind(doc.is_deprecated().as_i8())
            .bind(doc.is_ceased().as_i8())
            .bind(geometry::to_wkt(&geom))
            .bind(geometry::to_wkt(&geo_types::Geometry::Point(centroid)))
            .bind(bbox.min_x)
            .bind(bbox.min_y)
            .bind(bbox.max_x)
            .bind(bbox.max_y)
            .bind(doc.properties_json()?)
            .bind(doc.last_modified())
            .execute(&mut **tx)
            .await?;

        debug!("Indexed record {} into {} table", doc.id(), self.name);
        Ok(())
    }
}
