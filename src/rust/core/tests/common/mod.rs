//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use pipdb_core::{PoolSettings, QuerySettings, SpatialDatabase, SqlDatabase};

/// San Francisco-ish point inside [`sf_triangle`].
pub const SF_POINT: (f64, f64) = (-122.419, 37.774);

/// A file-backed database in a fresh temporary directory.
///
/// In-memory SQLite is one database per connection, so anything that
/// exercises the pool needs a file.
pub async fn file_database() -> (TempDir, Arc<SqlDatabase>) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("pip.db");
    let db = SqlDatabase::connect(path.to_str().expect("utf-8 path"), &PoolSettings::default())
        .await
        .expect("open database");
    (dir, Arc::new(db))
}

pub async fn spatial_database(settings: QuerySettings) -> (TempDir, SpatialDatabase) {
    let (dir, db) = file_database().await;
    let spatial = SpatialDatabase::with_database(db, settings)
        .await
        .expect("open spatial database");
    (dir, spatial)
}

/// A place feature with a single polygon ring.
pub fn feature(id: i64, placetype: &str, ring: &[[f64; 2]]) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "type": "Feature",
        "properties": {
            "wof:id": id,
            "wof:name": format!("place {}", id),
            "wof:placetype": placetype,
            "wof:country": "US",
            "wof:parent_id": -1,
            "wof:lastmodified": 1700000000,
            "mz:is_current": 1
        },
        "geometry": {"type": "Polygon", "coordinates": [ring]}
    }))
    .expect("serialize feature")
}

pub fn sf_triangle(id: i64) -> Vec<u8> {
    feature(
        id,
        "locality",
        &[[-122.5, 37.7], [-122.3, 37.7], [-122.4, 37.9], [-122.5, 37.7]],
    )
}

pub fn far_triangle(id: i64) -> Vec<u8> {
    feature(id, "locality", &[[10.0, 10.0], [11.0, 10.0], [10.5, 11.0], [10.0, 10.0]])
}

/// Axis-aligned square centred on (x, y).
pub fn square(id: i64, placetype: &str, x: f64, y: f64, half: f64) -> Vec<u8> {
    feature(
        id,
        placetype,
        &[
            [x - half, y - half],
            [x + half, y - half],
            [x + half, y + half],
            [x - half, y + half],
            [x - half, y - half],
        ],
    )
}
