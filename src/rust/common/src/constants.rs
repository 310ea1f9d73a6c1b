//! Canonical names and defaults shared across crates.

/// Geometry table holding one primary geometry row per record.
pub const TABLE_WHOSONFIRST: &str = "whosonfirst";

/// Document table holding raw GeoJSON bodies (primary and alternate).
pub const TABLE_GEOJSON: &str = "geojson";

/// Bounding-box table holding one row per polygon of a record.
pub const TABLE_RTREE: &str = "rtree";

/// Summary-document table holding one prepared JSON document per record and alternate.
pub const TABLE_SPELUNKER: &str = "spelunker";

/// Every table known to the default registry, in indexing order.
pub const ALL_TABLES: &[&str] = &[TABLE_WHOSONFIRST, TABLE_GEOJSON, TABLE_RTREE, TABLE_SPELUNKER];

/// Database URI scheme for the SQLite backend.
pub const SCHEME_SQLITE: &str = "sqlite";

/// Default database URI (in-memory).
pub const DEFAULT_DATABASE_URI: &str = "sqlite://?dsn=:memory:";

/// DSN value for an in-memory database.
pub const MEMORY_DSN: &str = ":memory:";

/// File extension of indexable documents.
pub const DOCUMENT_EXTENSION: &str = "geojson";
