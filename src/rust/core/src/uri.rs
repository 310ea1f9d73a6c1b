//! Record and resource URI parsing.
//!
//! Two kinds of URI show up at the boundaries:
//! - record URIs, the relative or absolute path of a document
//!   (`1234.geojson`, `123/4/1234-alt-quattroshapes.geojson`), which carry
//!   the record id and, for alternate geometries, the alternate label;
//! - resource URIs (`sqlite://?dsn=/tmp/pip.db`, `geojson://`), whose
//!   scheme selects a registered factory.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{SpatialError, SpatialResult};

const ALT_MARKER: &str = "-alt-";

/// Alternate geometry discriminator: `<source>[-<function>[-<extras>...]]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AltGeom {
    pub source: String,
    pub function: Option<String>,
    pub extras: Vec<String>,
}

impl AltGeom {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            function: None,
            extras: Vec::new(),
        }
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    /// Parse a label such as `naturalearth-display-terrain`.
    pub fn parse(label: &str) -> SpatialResult<Self> {
        let mut parts = label.split('-');
        let source = parts
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SpatialError::invalid_field("alt", format!("empty alternate label '{}'", label)))?;
        let function = parts.next().map(str::to_string);
        let extras: Vec<String> = parts.map(str::to_string).collect();
        if function.as_deref() == Some("") || extras.iter().any(String::is_empty) {
            return Err(SpatialError::invalid_field(
                "alt",
                format!("malformed alternate label '{}'", label),
            ));
        }
        Ok(Self {
            source: source.to_string(),
            function,
            extras,
        })
    }
}

impl fmt::Display for AltGeom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)?;
        if let Some(function) = &self.function {
            write!(f, "-{}", function)?;
        }
        for extra in &self.extras {
            write!(f, "-{}", extra)?;
        }
        Ok(())
    }
}

/// Identity of a record as derived from its URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordUri {
    pub id: i64,
    pub alt: Option<AltGeom>,
}

impl RecordUri {
    pub fn is_alternate(&self) -> bool {
        self.alt.is_some()
    }

    /// Relative path for a record id, split into 3-digit directories
    /// (`101736545` becomes `101/736/545/101736545.geojson`).
    pub fn relative_path(&self) -> String {
        let id = self.id.to_string();
        let dirs: Vec<&str> = id
            .as_bytes()
            .chunks(3)
            .filter_map(|c| std::str::from_utf8(c).ok())
            .collect();
        let file = match &self.alt {
            Some(alt) => format!("{}{}{}.geojson", id, ALT_MARKER, alt),
            None => format!("{}.geojson", id),
        };
        format!("{}/{}", dirs.join("/"), file)
    }
}

/// Parse a record URI: a path or bare id, optionally with an `-alt-` suffix.
pub fn parse_record_uri(uri: &str) -> SpatialResult<RecordUri> {
    let file_name = Path::new(uri)
        .file_name()
        .and_then(|f| f.to_str())
        .ok_or_else(|| SpatialError::validation(format!("invalid record URI '{}'", uri)))?;
    let stem = file_name.strip_suffix(".geojson").unwrap_or(file_name);

    let (id_part, alt) = match stem.split_once(ALT_MARKER) {
        Some((id_part, label)) => (id_part, Some(AltGeom::parse(label)?)),
        None => (stem, None),
    };

    let id = id_part
        .parse::<i64>()
        .map_err(|_| SpatialError::validation(format!("invalid record id in URI '{}'", uri)))?;
    if id < 0 {
        return Err(SpatialError::validation(format!("negative record id in URI '{}'", uri)));
    }

    Ok(RecordUri { id, alt })
}

/// A `scheme://location?key=value` resource URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceUri {
    pub scheme: String,
    pub location: String,
    pub query: HashMap<String, String>,
}

impl ResourceUri {
    pub fn parse(uri: &str) -> SpatialResult<Self> {
        let (scheme, rest) = uri
            .split_once("://")
            .ok_or_else(|| SpatialError::Config(format!("URI '{}' has no scheme", uri)))?;
        if scheme.is_empty() {
            return Err(SpatialError::Config(format!("URI '{}' has an empty scheme", uri)));
        }

        let (location, query_str) = match rest.split_once('?') {
            Some((loc, q)) => (loc, q),
            None => (rest, ""),
        };

        let query = query_str
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
                Ok((decode_component(k)?, decode_component(v)?))
            })
            .collect::<SpatialResult<HashMap<String, String>>>()?;

        Ok(Self {
            scheme: scheme.to_lowercase(),
            location: location.to_string(),
            query,
        })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }
}

/// Decode one query component: `+` is a space, `%XX` a byte of UTF-8.
fn decode_component(raw: &str) -> SpatialResult<String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| SpatialError::Config(format!("invalid escape in URI component '{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_primary_path() {
        let uri = parse_record_uri("/data/101/736/545/101736545.geojson").unwrap();
        assert_eq!(uri.id, 101736545);
        assert!(!uri.is_alternate());
    }

    #[test]
    fn test_parse_bare_id() {
        assert_eq!(parse_record_uri("42").unwrap().id, 42);
    }

    #[test]
    fn test_parse_alternate_path() {
        let uri = parse_record_uri("101736545-alt-naturalearth-display-terrain.geojson").unwrap();
        assert_eq!(uri.id, 101736545);
        let alt = uri.alt.unwrap();
        assert_eq!(alt.source, "naturalearth");
        assert_eq!(alt.function.as_deref(), Some("display"));
        assert_eq!(alt.extras, vec!["terrain".to_string()]);
        assert_eq!(alt.to_string(), "naturalearth-display-terrain");
    }

    #[test]
    fn test_parse_invalid_id() {
        assert!(parse_record_uri("not-a-number.geojson").is_err());
        assert!(parse_record_uri("123-alt-.geojson").is_err());
    }

    #[test]
    fn test_relative_path() {
        let uri = RecordUri { id: 101736545, alt: None };
        assert_eq!(uri.relative_path(), "101/736/545/101736545.geojson");

        let alt = RecordUri { id: 1234, alt: Some(AltGeom::new("quattroshapes")) };
        assert_eq!(alt.relative_path(), "123/4/1234-alt-quattroshapes.geojson");
    }

    #[test]
    fn test_resource_uri() {
        let uri = ResourceUri::parse("SQLite://?dsn=/tmp/pip.db&cache=shared").unwrap();
        assert_eq!(uri.scheme, "sqlite");
        assert_eq!(uri.location, "");
        assert_eq!(uri.get("dsn"), Some("/tmp/pip.db"));
        assert_eq!(uri.get("cache"), Some("shared"));
        assert_eq!(uri.get("missing"), None);
    }

    #[test]
    fn test_resource_uri_decodes_query() {
        let uri = ResourceUri::parse("sqlite://?dsn=/tmp/my%20places.db&name=wof+v2&k%3Dx=%C3%A9").unwrap();
        assert_eq!(uri.get("dsn"), Some("/tmp/my places.db"));
        assert_eq!(uri.get("name"), Some("wof v2"));
        assert_eq!(uri.get("k=x"), Some("é"));
    }

    #[test]
    fn test_resource_uri_rejects_invalid_utf8() {
        assert!(matches!(ResourceUri::parse("sqlite://?dsn=%FF"), Err(SpatialError::Config(_))));
    }

    #[test]
    fn test_resource_uri_without_query() {
        let uri = ResourceUri::parse("geojson://").unwrap();
        assert_eq!(uri.scheme, "geojson");
        assert!(uri.query.is_empty());
    }

    #[test]
    fn test_resource_uri_requires_scheme() {
        assert!(ResourceUri::parse("/tmp/pip.db").is_err());
        assert!(ResourceUri::parse("://x").is_err());
    }
}
