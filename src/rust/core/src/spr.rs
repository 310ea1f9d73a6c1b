//! Standard place results: the flat summary of a record returned by queries.

use serde::Serialize;

use crate::document::{Document, Existential};
use crate::error::SpatialResult;
use crate::geometry::BBox;
use crate::uri::RecordUri;

#[derive(Debug, Clone, Serialize)]
pub struct StandardPlaceResult {
    #[serde(rename = "wof:id")]
    pub id: i64,
    #[serde(rename = "wof:parent_id")]
    pub parent_id: i64,
    #[serde(rename = "wof:name")]
    pub name: String,
    #[serde(rename = "wof:placetype")]
    pub placetype: String,
    #[serde(rename = "wof:country")]
    pub country: String,
    #[serde(rename = "wof:repo")]
    pub repo: String,
    #[serde(rename = "wof:path")]
    pub path: String,
    #[serde(rename = "mz:uri")]
    pub uri: String,

    #[serde(rename = "mz:latitude")]
    pub latitude: f64,
    #[serde(rename = "mz:longitude")]
    pub longitude: f64,
    #[serde(rename = "mz:min_latitude")]
    pub min_latitude: f64,
    #[serde(rename = "mz:min_longitude")]
    pub min_longitude: f64,
    #[serde(rename = "mz:max_latitude")]
    pub max_latitude: f64,
    #[serde(rename = "mz:max_longitude")]
    pub max_longitude: f64,

    #[serde(rename = "edtf:inception")]
    pub inception: String,
    #[serde(rename = "edtf:cessation")]
    pub cessation: String,

    #[serde(rename = "mz:is_current")]
    pub is_current: Existential,
    #[serde(rename = "mz:is_ceased")]
    pub is_ceased: Existential,
    #[serde(rename = "mz:is_deprecated")]
    pub is_deprecated: Existential,
    #[serde(rename = "mz:is_superseded")]
    pub is_superseded: Existential,
    #[serde(rename = "mz:is_superseding")]
    pub is_superseding: Existential,

    #[serde(rename = "wof:supersedes")]
    pub supersedes: Vec<i64>,
    #[serde(rename = "wof:superseded_by")]
    pub superseded_by: Vec<i64>,
    #[serde(rename = "wof:belongsto")]
    pub belongs_to: Vec<i64>,

    #[serde(rename = "wof:lastmodified")]
    pub last_modified: i64,
}

impl StandardPlaceResult {
    /// Summarize a document. Fails when the document has no usable geometry.
    pub fn from_document(doc: &Document) -> SpatialResult<Self> {
        let geom = doc.geometry()?;
        let centroid = doc.centroid(&geom)?;
        let bbox = BBox::from_geometry(&geom)
            .unwrap_or_else(|| BBox::new(centroid.x(), centroid.y(), centroid.x(), centroid.y()));
        Ok(Self::with_geometry(doc, centroid.x(), centroid.y(), bbox))
    }

    pub(crate) fn with_geometry(doc: &Document, longitude: f64, latitude: f64, bbox: BBox) -> Self {
        let path = RecordUri { id: doc.id(), alt: None }.relative_path();
        Self {
            id: doc.id(),
            parent_id: doc.parent_id(),
            name: doc.name(),
            placetype: doc.placetype(),
            country: doc.country(),
            repo: doc.repo(),
            uri: format!("/{}", path),
            path,
            latitude,
            longitude,
            min_latitude: bbox.min_y,
            min_longitude: bbox.min_x,
            max_latitude: bbox.max_y,
            max_longitude: bbox.max_x,
            inception: doc.inception(),
            cessation: doc.cessation(),
            is_current: doc.is_current(),
            is_ceased: doc.is_ceased(),
            is_deprecated: doc.is_deprecated(),
            is_superseded: doc.is_superseded(),
            is_superseding: doc.is_superseding(),
            supersedes: doc.supersedes(),
            superseded_by: doc.superseded_by(),
            belongs_to: doc.belongs_to(),
            last_modified: doc.last_modified(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_document() {
        let body = serde_json::to_vec(&json!({
            "type": "Feature",
            "properties": {
                "wof:id": 101736545,
                "wof:name": "Montreal",
                "wof:placetype": "locality",
                "wof:country": "CA",
                "wof:repo": "whosonfirst-data-admin-ca",
                "mz:is_current": 1
            },
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[-74.0, 45.4], [-73.4, 45.4], [-73.4, 45.7], [-74.0, 45.7], [-74.0, 45.4]]]
            }
        }))
        .unwrap();

        let doc = Document::parse(&body).unwrap();
        let spr = StandardPlaceResult::from_document(&doc).unwrap();
        assert_eq!(spr.id, 101736545);
        assert_eq!(spr.path, "101/736/545/101736545.geojson");
        assert_eq!(spr.min_longitude, -74.0);
        assert_eq!(spr.max_latitude, 45.7);
        assert_eq!(spr.is_current, Existential::True);

        let value = serde_json::to_value(&spr).unwrap();
        assert_eq!(value["wof:name"], "Montreal");
        assert_eq!(value["mz:is_current"], 1);
        assert_eq!(value["mz:is_deprecated"], 0);
    }
}
