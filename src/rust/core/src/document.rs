//! Place documents.
//!
//! A document is a GeoJSON Feature whose `properties` follow the Who's On
//! First conventions (`wof:id`, `wof:placetype`, `mz:is_current`, ...). Tables
//! derive their projections from a parsed [`Document`]; the raw bytes are what
//! the document table stores.

use geo_types::{Geometry, Point};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{SpatialError, SpatialResult};
use crate::geometry;

/// Three-valued flag: known true, known false, or unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Existential {
    Unknown,
    False,
    True,
}

impl Existential {
    pub fn from_i64(value: i64) -> Self {
        match value {
            0 => Self::False,
            1 => Self::True,
            _ => Self::Unknown,
        }
    }

    pub fn as_i8(&self) -> i8 {
        match self {
            Self::Unknown => -1,
            Self::False => 0,
            Self::True => 1,
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Self::True)
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl Serialize for Existential {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.as_i8())
    }
}

impl From<bool> for Existential {
    fn from(b: bool) -> Self {
        if b { Self::True } else { Self::False }
    }
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    properties: Map<String, Value>,
    #[serde(default)]
    geometry: Option<Value>,
}

/// EDTF values meaning "no date" for deprecation/cessation purposes.
const EDTF_UNSET: &[&str] = &["", "u", "uuuu", "..", "open"];

/// A parsed place document.
#[derive(Debug, Clone)]
pub struct Document {
    id: i64,
    properties: Map<String, Value>,
    geometry: Option<Value>,
}

impl Document {
    /// Parse a GeoJSON Feature. Fails if the body is not JSON or has no usable id.
    pub fn parse(body: &[u8]) -> SpatialResult<Self> {
        let raw: RawFeature = serde_json::from_slice(body)
            .map_err(|e| SpatialError::validation(format!("document is not a GeoJSON feature: {}", e)))?;

        let id = raw
            .properties
            .get("wof:id")
            .and_then(as_i64)
            .or_else(|| raw.id.as_ref().and_then(as_i64))
            .ok_or_else(|| SpatialError::invalid_field("wof:id", "document has no numeric id"))?;

        if id < 0 {
            return Err(SpatialError::invalid_field("wof:id", format!("invalid id {}", id)));
        }

        Ok(Self {
            id,
            properties: raw.properties,
            geometry: raw.geometry,
        })
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    /// Serialized properties, stored as the geometry table's property blob.
    pub fn properties_json(&self) -> SpatialResult<String> {
        Ok(serde_json::to_string(&self.properties)?)
    }

    /// `wof:lastmodified` in Unix seconds, or -1 when absent.
    pub fn last_modified(&self) -> i64 {
        self.int_property("wof:lastmodified").unwrap_or(-1)
    }

    pub fn name(&self) -> String {
        self.str_property("wof:name").unwrap_or_default()
    }

    pub fn placetype(&self) -> String {
        self.str_property("wof:placetype").unwrap_or_else(|| "unknown".to_string())
    }

    pub fn country(&self) -> String {
        self.str_property("wof:country").unwrap_or_else(|| "XX".to_string())
    }

    pub fn repo(&self) -> String {
        self.str_property("wof:repo").unwrap_or_default()
    }

    /// `wof:parent_id`, or -1 when unknown.
    pub fn parent_id(&self) -> i64 {
        self.int_property("wof:parent_id").unwrap_or(-1)
    }

    pub fn inception(&self) -> String {
        self.str_property("edtf:inception").unwrap_or_else(|| "uuuu".to_string())
    }

    pub fn cessation(&self) -> String {
        self.str_property("edtf:cessation").unwrap_or_else(|| "uuuu".to_string())
    }

    /// Alternate geometry label declared inside the document, if any.
    pub fn alt_label(&self) -> Option<String> {
        self.str_property("src:alt_label").filter(|s| !s.is_empty())
    }

    pub fn belongs_to(&self) -> Vec<i64> {
        self.id_list("wof:belongsto")
    }

    pub fn supersedes(&self) -> Vec<i64> {
        self.id_list("wof:supersedes")
    }

    pub fn superseded_by(&self) -> Vec<i64> {
        self.id_list("wof:superseded_by")
    }

    pub fn is_deprecated(&self) -> Existential {
        self.edtf_flag("edtf:deprecated")
    }

    pub fn is_ceased(&self) -> Existential {
        self.edtf_flag("edtf:cessation")
    }

    pub fn is_superseded(&self) -> Existential {
        Existential::from(!self.superseded_by().is_empty())
    }

    pub fn is_superseding(&self) -> Existential {
        Existential::from(!self.supersedes().is_empty())
    }

    /// `mz:is_current` when set, otherwise inferred false for deprecated,
    /// ceased or superseded records, otherwise unknown.
    pub fn is_current(&self) -> Existential {
        if let Some(v) = self.int_property("mz:is_current") {
            let flag = Existential::from_i64(v);
            if flag.is_known() {
                return flag;
            }
        }
        if self.is_deprecated().is_true() || self.is_ceased().is_true() || self.is_superseded().is_true() {
            return Existential::False;
        }
        Existential::Unknown
    }

    /// The document geometry, decoded from GeoJSON.
    pub fn geometry(&self) -> SpatialResult<Geometry<f64>> {
        let value = self
            .geometry
            .as_ref()
            .filter(|v| !v.is_null())
            .ok_or_else(|| SpatialError::invalid_field("geometry", format!("record {} has no geometry", self.id)))?;
        geometry::from_geojson_value(value)
    }

    /// `geom:longitude`/`geom:latitude` when present, else the computed centroid.
    pub fn centroid(&self, geom: &Geometry<f64>) -> SpatialResult<Point<f64>> {
        if let (Some(lon), Some(lat)) = (
            self.float_property("geom:longitude"),
            self.float_property("geom:latitude"),
        ) {
            return Ok(Point::new(lon, lat));
        }
        geometry::centroid(geom).ok_or_else(|| {
            SpatialError::invalid_field("geometry", format!("record {} has an empty geometry", self.id))
        })
    }

    fn str_property(&self, key: &str) -> Option<String> {
        self.properties.get(key).and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    fn int_property(&self, key: &str) -> Option<i64> {
        self.properties.get(key).and_then(as_i64)
    }

    fn float_property(&self, key: &str) -> Option<f64> {
        self.properties.get(key).and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        })
    }

    fn id_list(&self, key: &str) -> Vec<i64> {
        match self.properties.get(key) {
            Some(Value::Array(items)) => items.iter().filter_map(as_i64).collect(),
            _ => Vec::new(),
        }
    }

    fn edtf_flag(&self, key: &str) -> Existential {
        match self.str_property(key) {
            Some(v) if !EDTF_UNSET.contains(&v.as_str()) => Existential::True,
            _ => Existential::False,
        }
    }
}

/// Accept ids written as integers, integral floats or numeric strings.
fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
