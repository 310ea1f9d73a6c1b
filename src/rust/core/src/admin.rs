//! Table maintenance: purge whole tables, prune individual records.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::database::SqlDatabase;
use crate::error::SpatialResult;
use crate::ingest::collect_documents;
use crate::tables::Table;
use crate::uri::parse_record_uri;

/// Delete every row of `tables` in one transaction.
pub async fn purge_tables(db: &SqlDatabase, tables: &[Arc<dyn Table>]) -> SpatialResult<u64> {
    let _guard = db.lock().await;
    db.purge_tables(tables).await
}

/// Delete the rows of each id from `tables`, one transaction per id.
/// Returns the number of ids that had at least one row.
pub async fn prune_tables(db: &SqlDatabase, tables: &[Arc<dyn Table>], ids: &[i64]) -> SpatialResult<usize> {
    let mut pruned = 0;
    for id in ids {
        let _guard = db.lock().await;
        let removed = db.remove_feature(tables, *id).await?;
        if removed > 0 {
            pruned += 1;
        }
        debug!("Pruned {} rows for record {}", removed, id);
    }
    info!("Pruned {} of {} records", pruned, ids.len());
    Ok(pruned)
}

/// Record ids named by the document files under `paths`. Alternate files
/// map to their record's id.
pub fn ids_from_paths(paths: &[PathBuf]) -> SpatialResult<Vec<i64>> {
    let ids: BTreeSet<i64> = collect_documents(paths)?
        .iter()
        .filter_map(|p| parse_record_uri(&p.to_string_lossy()).ok())
        .map(|r| r.id)
        .collect();
    Ok(ids.into_iter().collect())
}

/// Prune every record named by the files under `paths`.
pub async fn prune_paths(db: &SqlDatabase, tables: &[Arc<dyn Table>], paths: &[PathBuf]) -> SpatialResult<usize> {
    let ids = ids_from_paths(paths)?;
    prune_tables(db, tables, &ids).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ids_from_paths_deduplicates_alternates() {
        let dir = TempDir::new().unwrap();
        for name in ["1234.geojson", "1234-alt-quattroshapes.geojson", "99.geojson", "notes.geojson"] {
            std::fs::write(dir.path().join(name), "{}").unwrap();
        }
        let ids = ids_from_paths(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(ids, vec![99, 1234]);
    }
}
