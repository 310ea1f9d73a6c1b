//! Integration tests for the multi-table indexing protocol: atomic index,
//! idempotent re-index, alternate geometries, removal and purge.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Sqlite, Transaction};

use pipdb_core::tables::Table;
use pipdb_core::{
    AltGeom, DocumentWriter, PoolSettings, SpatialError, SpatialResult, SqlDatabase, TableRegistry,
    TableWriter,
};
use tempfile::TempDir;

use common::{file_database, sf_triangle};

async fn default_tables(db: &SqlDatabase) -> Vec<Arc<dyn Table>> {
    let registry = TableRegistry::with_defaults();
    registry
        .new_tables_with_database(
            &["whosonfirst".to_string(), "geojson".to_string(), "rtree".to_string()],
            db,
        )
        .await
        .unwrap()
}

async fn count(db: &SqlDatabase, table: &str, column: &str, id: i64) -> i64 {
    db.count_rows(table, column, id).await.unwrap()
}

/// Fails on every write, after the tables before it have written.
#[derive(Debug)]
struct BrokenTable;

#[async_trait]
impl Table for BrokenTable {
    fn name(&self) -> &str {
        "broken"
    }

    fn schema(&self) -> String {
        String::new()
    }

    fn supports_alternate_geometries(&self) -> bool {
        false
    }

    async fn index_feature(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        _body: &[u8],
        _alt: Option<&AltGeom>,
    ) -> SpatialResult<()> {
        sqlx::query("INSERT INTO table_that_does_not_exist (id) VALUES (1)")
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

#[tokio::test]
async fn test_index_writes_every_table() {
    let (_dir, db) = file_database().await;
    let tables = default_tables(&db).await;

    db.index_feature(&tables, &sf_triangle(100), None).await.unwrap();

    assert_eq!(count(&db, "whosonfirst", "id", 100).await, 1);
    assert_eq!(count(&db, "geojson", "id", 100).await, 1);
    assert_eq!(count(&db, "rtree", "wof_id", 100).await, 1);
}

#[tokio::test]
async fn test_reindex_is_idempotent() {
    let (_dir, db) = file_database().await;
    let tables = default_tables(&db).await;

    for _ in 0..3 {
        db.index_feature(&tables, &sf_triangle(100), None).await.unwrap();
    }

    assert_eq!(count(&db, "whosonfirst", "id", 100).await, 1);
    assert_eq!(count(&db, "geojson", "id", 100).await, 1);
    assert_eq!(count(&db, "rtree", "wof_id", 100).await, 1);
}

#[tokio::test]
async fn test_failing_table_rolls_back_everything() {
    let (_dir, db) = file_database().await;
    let mut tables = default_tables(&db).await;
    tables.push(Arc::new(BrokenTable));

    let err = db.index_feature(&tables, &sf_triangle(100), None).await.unwrap_err();
    assert_eq!(err.table(), Some("broken"));
    assert!(err.is_storage());

    assert_eq!(count(&db, "whosonfirst", "id", 100).await, 0);
    assert_eq!(count(&db, "geojson", "id", 100).await, 0);
    assert_eq!(count(&db, "rtree", "wof_id", 100).await, 0);
}

#[tokio::test]
async fn test_malformed_document_names_first_table() {
    let (_dir, db) = file_database().await;
    let tables = default_tables(&db).await;

    let err = db.index_feature(&tables, b"{\"type\": \"Feature\"}", None).await.unwrap_err();
    assert_eq!(err.table(), Some("whosonfirst"));
    assert!(err.is_validation());
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_alternate_skips_geometry_table() {
    let (_dir, db) = file_database().await;
    let tables = default_tables(&db).await;
    let alt = AltGeom::new("quattroshapes");

    db.index_feature(&tables, &sf_triangle(200), Some(&alt)).await.unwrap();

    assert_eq!(count(&db, "whosonfirst", "id", 200).await, 0);
    assert_eq!(count(&db, "geojson", "id", 200).await, 1);
    assert_eq!(count(&db, "rtree", "wof_id", 200).await, 1);

    let label: String = sqlx::query_scalar("SELECT alt FROM geojson WHERE id = 200")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(label, "quattroshapes");
}

#[tokio::test]
async fn test_primary_and_alternate_coexist() {
    let (_dir, db) = file_database().await;
    let tables = default_tables(&db).await;

    db.index_feature(&tables, &sf_triangle(300), None).await.unwrap();
    db.index_feature(&tables, &sf_triangle(300), Some(&AltGeom::new("osm"))).await.unwrap();

    assert_eq!(count(&db, "whosonfirst", "id", 300).await, 1);
    assert_eq!(count(&db, "geojson", "id", 300).await, 2);
    assert_eq!(count(&db, "rtree", "wof_id", 300).await, 2);
}

#[tokio::test]
async fn test_remove_feature_clears_every_table() {
    let (_dir, db) = file_database().await;
    let tables = default_tables(&db).await;

    db.index_feature(&tables, &sf_triangle(42), None).await.unwrap();
    db.index_feature(&tables, &sf_triangle(42), Some(&AltGeom::new("osm"))).await.unwrap();
    db.index_feature(&tables, &sf_triangle(43), None).await.unwrap();

    let removed = db.remove_feature(&tables, 42).await.unwrap();
    assert_eq!(removed, 5);

    assert_eq!(count(&db, "whosonfirst", "id", 42).await, 0);
    assert_eq!(count(&db, "geojson", "id", 42).await, 0);
    assert_eq!(count(&db, "rtree", "wof_id", 42).await, 0);
    assert_eq!(count(&db, "whosonfirst", "id", 43).await, 1);
}

#[tokio::test]
async fn test_remove_missing_record_is_not_an_error() {
    let (_dir, db) = file_database().await;
    let tables = default_tables(&db).await;
    assert_eq!(db.remove_feature(&tables, 999).await.unwrap(), 0);
}

#[tokio::test]
async fn test_purge_tables() {
    let (_dir, db) = file_database().await;
    let tables = default_tables(&db).await;

    for id in 1..=3 {
        db.index_feature(&tables, &sf_triangle(id), None).await.unwrap();
    }
    let removed = pipdb_core::admin::purge_tables(&db, &tables).await.unwrap();
    assert_eq!(removed, 9);

    for id in 1..=3 {
        assert_eq!(count(&db, "whosonfirst", "id", id).await, 0);
    }
}

#[tokio::test]
async fn test_prune_tables_counts_records() {
    let (_dir, db) = file_database().await;
    let tables = default_tables(&db).await;

    db.index_feature(&tables, &sf_triangle(1), None).await.unwrap();
    db.index_feature(&tables, &sf_triangle(2), None).await.unwrap();

    let pruned = pipdb_core::admin::prune_tables(&db, &tables, &[1, 2, 3]).await.unwrap();
    assert_eq!(pruned, 2);
    assert_eq!(count(&db, "geojson", "id", 1).await, 0);
}

#[tokio::test]
async fn test_unknown_table_scheme() {
    let (_dir, db) = file_database().await;
    let registry = TableRegistry::with_defaults();
    let err = registry.new_table_with_database("postgis://", &db).await.unwrap_err();
    assert!(matches!(err, SpatialError::UnknownScheme(_)));
}

#[tokio::test]
async fn test_spelunker_table_stores_summaries_per_alternate() {
    let (_dir, db) = file_database().await;
    let tables = TableRegistry::with_defaults()
        .new_tables_with_database(&["spelunker".to_string()], &db)
        .await
        .unwrap();

    db.index_feature(&tables, &sf_triangle(500), None).await.unwrap();
    db.index_feature(&tables, &sf_triangle(500), Some(&AltGeom::new("osm"))).await.unwrap();
    db.index_feature(&tables, &sf_triangle(500), None).await.unwrap();
    assert_eq!(count(&db, "spelunker", "id", 500).await, 2);

    let body: String = sqlx::query_scalar("SELECT body FROM spelunker WHERE id = 500 AND alt = 'osm'")
        .fetch_one(db.pool())
        .await
        .unwrap();
    let summary: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(summary["wof:id"], 500);
    assert_eq!(summary["src:alt_label"], "osm");
    assert!(summary.get("geometry").is_none());

    assert_eq!(db.remove_feature(&tables, 500).await.unwrap(), 2);
}

#[tokio::test]
async fn test_table_writer_from_uri() {
    let dir = TempDir::new().unwrap();
    let uri = format!(
        "sqlite://?dsn={}&whosonfirst=1&geojson=1&spelunker=true&rtree=0",
        dir.path().join("writer.db").display()
    );
    let writer = TableWriter::from_uri(&uri, &PoolSettings::default()).await.unwrap();
    let names: Vec<&str> = writer.tables().iter().map(|t| t.name()).collect();
    assert_eq!(names, vec!["geojson", "spelunker", "whosonfirst"]);

    let body = sf_triangle(600);
    assert_eq!(writer.write("600.geojson", &body).await.unwrap(), body.len() as u64);
    writer.write("600-alt-quattroshapes.geojson", &body).await.unwrap();

    let db = writer.database();
    assert_eq!(count(db, "whosonfirst", "id", 600).await, 1);
    assert_eq!(count(db, "geojson", "id", 600).await, 2);
    assert_eq!(count(db, "spelunker", "id", 600).await, 2);

    let alt: String = sqlx::query_scalar("SELECT alt FROM geojson WHERE id = 600 AND alt != ''")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(alt, "quattroshapes");

    writer.close().await.unwrap();
}

#[tokio::test]
async fn test_table_writer_requires_tables() {
    let dir = TempDir::new().unwrap();
    let uri = format!("sqlite://?dsn={}&geojson=0", dir.path().join("writer.db").display());
    let err = TableWriter::from_uri(&uri, &PoolSettings::default()).await.unwrap_err();
    assert!(matches!(err, SpatialError::Config(_)));
}
