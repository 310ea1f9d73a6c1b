//! Transactional database
//!
//! Owns the SQLite connection pool and a coarse application-level write lock,
//! and implements the multi-table protocols: index one document into every
//! configured table inside a single transaction, remove one record from every
//! table inside a single transaction, and purge whole tables.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard, OwnedMutexGuard};
use tracing::{debug, info, warn};

use pipdb_common::constants::{MEMORY_DSN, SCHEME_SQLITE};

use crate::config::PoolSettings;
use crate::error::{SpatialError, SpatialResult};
use crate::tables::Table;
use crate::uri::{AltGeom, ResourceUri};

/// Table existence, memoized per `dsn#table` for the process lifetime.
static TABLE_LOOKUP: Lazy<Mutex<HashMap<String, bool>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Future returned by a [`DatabaseFactory`].
pub type DatabaseFuture<'a> = Pin<Box<dyn Future<Output = SpatialResult<SqlDatabase>> + Send + 'a>>;

/// Opens a database for a parsed URI whose scheme it was registered under.
pub type DatabaseFactory = for<'a> fn(&'a ResourceUri, &'a PoolSettings) -> DatabaseFuture<'a>;

/// Database backends keyed by URI scheme.
pub struct DatabaseRegistry {
    factories: BTreeMap<String, DatabaseFactory>,
}

impl DatabaseRegistry {
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// A registry holding the `sqlite://` backend.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.factories.insert(SCHEME_SQLITE.to_string(), sqlite_factory);
        registry
    }

    pub fn register(&mut self, scheme: &str, factory: DatabaseFactory) -> SpatialResult<()> {
        let scheme = scheme.to_lowercase();
        if self.factories.contains_key(&scheme) {
            return Err(SpatialError::Config(format!(
                "database scheme '{}' is already registered",
                scheme
            )));
        }
        self.factories.insert(scheme, factory);
        Ok(())
    }

    pub fn schemes(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Open the database named by `uri` with the factory for its scheme.
    pub async fn open(&self, uri: &str, settings: &PoolSettings) -> SpatialResult<SqlDatabase> {
        let parsed = ResourceUri::parse(uri)?;
        let factory = self
            .factories
            .get(&parsed.scheme)
            .ok_or_else(|| SpatialError::UnknownScheme(parsed.scheme.clone()))?;
        factory(&parsed, settings).await
    }
}

impl Default for DatabaseRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for DatabaseRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}

fn sqlite_factory<'a>(uri: &'a ResourceUri, settings: &'a PoolSettings) -> DatabaseFuture<'a> {
    Box::pin(async move {
        let dsn = uri
            .get("dsn")
            .filter(|d| !d.is_empty())
            .ok_or_else(|| SpatialError::Config(format!("{}:// URI is missing a dsn", uri.scheme)))?;
        SqlDatabase::connect(dsn, settings).await
    })
}

/// Time spent by one table inside an indexing transaction.
#[derive(Debug, Clone)]
pub struct TableTiming {
    pub table: String,
    pub elapsed: Duration,
}

/// A SQLite database shared by tables, the spatial database and ingestion workers.
#[derive(Debug)]
pub struct SqlDatabase {
    pool: SqlitePool,
    dsn: String,
    write_lock: Arc<AsyncMutex<()>>,
}

impl SqlDatabase {
    /// Open a database from a `sqlite://?dsn=<path>` URI.
    pub async fn from_uri(uri: &str, settings: &PoolSettings) -> SpatialResult<Self> {
        DatabaseRegistry::with_defaults().open(uri, settings).await
    }

    /// Open a database for a DSN (a file path or `:memory:`).
    pub async fn connect(dsn: &str, settings: &PoolSettings) -> SpatialResult<Self> {
        let in_memory = dsn == MEMORY_DSN;

        let pool = if in_memory {
            // Every in-memory connection is its own database, so the pool is
            // pinned to a single connection that is never recycled.
            debug!("Opening in-memory database with a single pinned connection");
            let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
                .connect_with(options)
                .await?
        } else {
            let options = SqliteConnectOptions::new()
                .filename(dsn)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
                .busy_timeout(Duration::from_millis(settings.busy_timeout_ms));
            SqlitePoolOptions::new()
                .max_connections(settings.max_connections)
                .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
                .connect_with(options)
                .await?
        };

        info!("Connected to database {}", dsn);

        Ok(Self {
            pool,
            dsn: dsn.to_string(),
            write_lock: Arc::new(AsyncMutex::new(())),
        })
    }

    /// The connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    pub fn is_memory(&self) -> bool {
        self.dsn == MEMORY_DSN
    }

    /// Acquire the application-level write lock. Callers hold the guard across
    /// read-derive-write sequences; dropping it releases the lock.
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }

    /// Owned variant of [`lock`](Self::lock) for guards moved into spawned tasks.
    pub async fn lock_owned(&self) -> OwnedMutexGuard<()> {
        self.write_lock.clone().lock_owned().await
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed database {}", self.dsn);
    }

    /// Whether `table` exists, memoized per `(dsn, table)`.
    pub async fn has_table(&self, table: &str) -> SpatialResult<bool> {
        let key = format!("{}#{}", self.dsn, table);

        if !self.is_memory() {
            if let Some(found) = lookup_cached(&key) {
                return Ok(found);
            }
        }

        let found: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1)",
        )
        .bind(table)
        .fetch_one(&self.pool)
        .await?;

        if !self.is_memory() {
            remember(key, found);
        }
        Ok(found)
    }

    /// Run `schema` unless `table` is already known to exist.
    pub async fn create_table_if_necessary(&self, table: &str, schema: &str) -> SpatialResult<()> {
        if !self.is_memory() && self.has_table(table).await? {
            debug!("Table {} already exists", table);
            return Ok(());
        }

        debug!("Creating table {}", table);
        let mut tx = self.pool.begin().await?;
        for statement in schema.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;

        if !self.is_memory() {
            remember(format!("{}#{}", self.dsn, table), true);
        }
        Ok(())
    }

    /// Index one document into every table atomically.
    ///
    /// All tables write inside a single transaction; if any table fails the
    /// transaction is rolled back and the error names that table.
    pub async fn index_feature(
        &self,
        tables: &[Arc<dyn Table>],
        body: &[u8],
        alt: Option<&AltGeom>,
    ) -> SpatialResult<()> {
        self.index_feature_with_timings(tables, body, alt).await.map(|_| ())
    }

    /// [`index_feature`](Self::index_feature), reporting time spent per table.
    pub async fn index_feature_with_timings(
        &self,
        tables: &[Arc<dyn Table>],
        body: &[u8],
        alt: Option<&AltGeom>,
    ) -> SpatialResult<Vec<TableTiming>> {
        let mut tx = self.pool.begin().await?;
        let mut timings = Vec::with_capacity(tables.len());

        for table in tables {
            let started = Instant::now();
            if let Err(e) = table.index_feature(&mut tx, body, alt).await {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("Rollback after {} failure also failed: {}", table.name(), rollback_err);
                }
                return Err(SpatialError::in_table(table.name(), e));
            }
            timings.push(TableTiming {
                table: table.name().to_string(),
                elapsed: started.elapsed(),
            });
        }

        tx.commit().await?;
        Ok(timings)
    }

    /// Delete record `id` from every table atomically, keyed by each table's id column.
    pub async fn remove_feature(&self, tables: &[Arc<dyn Table>], id: i64) -> SpatialResult<u64> {
        let mut tx = self.pool.begin().await?;
        let mut removed = 0;

        for table in tables {
            let sql = format!("DELETE FROM {} WHERE {} = ?1", table.name(), table.id_column());
            match sqlx::query(&sql).bind(id).execute(&mut *tx).await {
                Ok(result) => removed += result.rows_affected(),
                Err(e) => {
                    if let Err(rollback_err) = tx.rollback().await {
                        warn!("Rollback after {} failure also failed: {}", table.name(), rollback_err);
                    }
                    return Err(SpatialError::in_table(table.name(), e.into()));
                }
            }
        }

        tx.commit().await?;
        debug!("Removed {} rows for record {}", removed, id);
        Ok(removed)
    }

    /// Delete every row of every table atomically.
    pub async fn purge_tables(&self, tables: &[Arc<dyn Table>]) -> SpatialResult<u64> {
        let mut tx = self.pool.begin().await?;
        let mut removed = 0;

        for table in tables {
            let sql = format!("DELETE FROM {}", table.name());
            let result = sqlx::query(&sql)
                .execute(&mut *tx)
                .await
                .map_err(|e| SpatialError::in_table(table.name(), e.into()))?;
            removed += result.rows_affected();
        }

        tx.commit().await?;
        info!("Purged {} rows from {} tables", removed, tables.len());
        Ok(removed)
    }

    /// Number of rows in `table` whose `column` equals `id`.
    pub async fn count_rows(&self, table: &str, column: &str, id: i64) -> SpatialResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE {} = ?1", table, column);
        let count: i64 = sqlx::query_scalar(&sql).bind(id).fetch_one(&self.pool).await?;
        Ok(count)
    }
}

fn lookup_cached(key: &str) -> Option<bool> {
    TABLE_LOOKUP.lock().ok().and_then(|m| m.get(key).copied())
}

fn remember(key: String, found: bool) {
    if let Ok(mut m) = TABLE_LOOKUP.lock() {
        m.insert(key, found);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings() -> PoolSettings {
        PoolSettings::default()
    }

    #[tokio::test]
    async fn test_from_uri_rejects_unknown_scheme() {
        let err = SqlDatabase::from_uri("mysql://?dsn=x", &settings()).await.unwrap_err();
        assert!(matches!(err, SpatialError::UnknownScheme(s) if s == "mysql"));
    }

    #[tokio::test]
    async fn test_from_uri_requires_dsn() {
        let err = SqlDatabase::from_uri("sqlite://", &settings()).await.unwrap_err();
        assert!(matches!(err, SpatialError::Config(_)));
    }

    #[tokio::test]
    async fn test_from_uri_decodes_dsn() {
        let dir = TempDir::new().unwrap();
        let uri = format!("sqlite://?dsn={}/my%20places.db", dir.path().display());
        let db = SqlDatabase::from_uri(&uri, &settings()).await.unwrap();
        assert!(db.dsn().ends_with("/my places.db"));
        assert!(dir.path().join("my places.db").exists());
        db.close().await;
    }

    #[tokio::test]
    async fn test_registry_rejects_duplicate_scheme() {
        let mut registry = DatabaseRegistry::with_defaults();
        assert_eq!(registry.schemes(), vec!["sqlite".to_string()]);
        assert!(matches!(registry.register("SQLite", sqlite_factory), Err(SpatialError::Config(_))));
    }

    #[tokio::test]
    async fn test_memory_database() {
        let db = SqlDatabase::from_uri("sqlite://?dsn=:memory:", &settings()).await.unwrap();
        assert!(db.is_memory());
        db.create_table_if_necessary("things", "CREATE TABLE IF NOT EXISTS things (id INTEGER PRIMARY KEY)")
            .await
            .unwrap();
        assert!(db.has_table("things").await.unwrap());
    }

    #[tokio::test]
    async fn test_table_lookup_is_memoized() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memo.db");
        let db = SqlDatabase::connect(path.to_str().unwrap(), &settings()).await.unwrap();

        db.create_table_if_necessary(
            "memo",
            "CREATE TABLE IF NOT EXISTS memo (id INTEGER PRIMARY KEY); CREATE INDEX IF NOT EXISTS memo_id ON memo (id)",
        )
        .await
        .unwrap();
        assert!(db.has_table("memo").await.unwrap());

        // Dropped behind the memo's back: the cached answer survives until restart.
        sqlx::query("DROP TABLE memo").execute(db.pool()).await.unwrap();
        assert!(db.has_table("memo").await.unwrap());
    }

    #[tokio::test]
    async fn test_lock_serializes_callers() {
        let db = Arc::new(SqlDatabase::connect(":memory:", &settings()).await.unwrap());
        let guard = db.lock().await;

        let db2 = db.clone();
        let waiter = tokio::spawn(async move {
            let _g = db2.lock_owned().await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        drop(guard);
        waiter.await.unwrap();
    }
}
