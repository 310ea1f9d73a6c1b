//! Bounding-box table: one row per polygon of every geometry, primary and
//! alternate. Rows have a surrogate key; the record id is `wof_id`.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Sqlite, Transaction};
use tracing::debug;

use pipdb_common::constants::TABLE_RTREE;
use pipdb_common::schema::sqlite::rtree as rt;
use pipdb_common::schema::{column_list, placeholders};

use super::{table_name, Table};
use crate::document::Document;
use crate::error::{SpatialError, SpatialResult};
use crate::geometry::{self, BBox};
use crate::uri::{AltGeom, ResourceUri};

#[derive(Debug, Clone)]
pub struct RTreeTable {
    name: String,
}

impl RTreeTable {
    pub fn new() -> Self {
        Self {
            name: TABLE_RTREE.to_string(),
        }
    }

    pub fn from_uri(uri: &ResourceUri) -> Self {
        Self {
            name: table_name(uri, TABLE_RTREE),
        }
    }
}

impl Default for RTreeTable {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn factory(uri: &ResourceUri) -> SpatialResult<Arc<dyn Table>> {
    Ok(Arc::new(RTreeTable::from_uri(uri)))
}

#[async_trait]
impl Table for RTreeTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> String {
        format!(
            r#"CREATE TABLE IF NOT EXISTS {t} (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    wof_id INTEGER NOT NULL,
    is_alt INTEGER NOT NULL,
    alt_label TEXT NOT NULL DEFAULT '',
    min_x REAL NOT NULL,
    min_y REAL NOT NULL,
    max_x REAL NOT NULL,
    max_y REAL NOT NULL,
    geometry TEXT NOT NULL,
    lastmodified INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS {t}_wof_id ON {t} (wof_id, alt_label);
CREATE INDEX IF NOT EXISTS {t}_bbox ON {t} (min_x, max_x, min_y, max_y)"#,
            t = self.name
        )
    }

    fn id_column(&self) -> &str {
        rt::WOF_ID.name
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
        let geom = doc.geometry()?;
        let alt_label = alt.map(|a| a.to_string()).unwrap_or_default();

        let mut shapes: Vec<geo_types::Geometry<f64>> = geometry::polygons(&geom)
            .into_iter()
            .map(geo_types::Geometry::Polygon)
            .collect();
        if shapes.is_empty() {
            shapes.push(geom);
        }

        let delete = format!("DELETE FROM {} WHERE wof_id = ?1 AND alt_label = ?2", self.name);
        sqlx::query(&delete)
            .bind(doc.id())
            .bind(&alt_label)
            .execute(&mut **tx)
            .await?;

        let insert = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.name,
            column_list(rt::INSERT_COLUMNS),
            placeholders(rt::INSERT_COLUMNS.len())
        );

        for shape in &shapes {
            let bbox = BBox::from_geometry(shape).ok_or_else(|| {
                SpatialError::invalid_field("geometry", format!("record {} has an empty geometry", doc.id()))
            })?;
            sqlx::query(&insert)
                .bind(doc.id())
                .bind(alt.is_some())
                .bind(&alt_label)
                .bind(bbox.min_x)
                .bind(bbox.min_y)
                .bind(bbox.max_x)
                .bind(bbox.max_y)
                .bind(geometry::to_wkt(shape))
                .bind(doc.last_modified())
                .execute(&mut **tx)
                .await?;
        }

        debug!(
            "Indexed {} bounding boxes for record {} (alt '{}') into {} table",
            shapes.len(),
            doc.id(),
            alt_label,
            self.name
        );
        Ok(())
    }
}
