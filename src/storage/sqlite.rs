use super::{StoreError, StoreResult};
use sqlx::sqlite::{SqliteConnectOptions, SqliteExecutor, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Singleton counter row
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct VisitorCount {
    pub id: i64,
    pub count: i64,
}

impl VisitorCount {
    /// A fresh counter that has not been persisted yet
    pub fn new(id: i64) -> Self {
        Self { id, count: 0 }
    }
}

/// SQLite-backed counter store
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `url` and run the schema setup
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let opts = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        let filename = opts.get_filename();
        if filename != Path::new(":memory:") {
            if let Some(parent) = filename.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
        }

        info!(database = %filename.display(), "Opening SQLite database");
        Self::with_options(opts).await
    }

    /// In-memory database, lives as long as the store
    pub async fn in_memory() -> StoreResult<Self> {
        Self::with_options(SqliteConnectOptions::from_str("sqlite::memory:")?).await
    }

    async fn with_options(opts: SqliteConnectOptions) -> StoreResult<Self> {
        // One connection: a transaction owns it for its whole read-modify-write,
        // and an in-memory database would otherwise differ per connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> StoreResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS visitor_count (
                id INTEGER PRIMARY KEY,
                count INTEGER NOT NULL DEFAULT 0 CHECK (count >= 0)
            )",
        )
        .execute(&self.pool)
        .await?;

        debug!("visitor_count table ready");
        Ok(())
    }

    /// Start a transaction on the pool
    pub async fn begin(&self) -> StoreResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    /// Look up a counter by id outside of any transaction
    pub async fn get(&self, id: i64) -> StoreResult<Option<VisitorCount>> {
        find_by_id(&self.pool, id).await
    }

    pub async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Fetch the counter row with the given id, if it exists
pub async fn find_by_id<'e, E>(executor: E, id: i64) -> StoreResult<Option<VisitorCount>>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, VisitorCount>("SELECT id, count FROM visitor_count WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(StoreError::from)
}

/// Insert or overwrite the counter row
pub async fn save<'e, E>(executor: E, counter: &VisitorCount) -> StoreResult<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO visitor_count (id, count) VALUES (?, ?)
         ON CONFLICT(id) DO UPDATE SET count = excluded.count",
    )
    .bind(counter.id)
    .bind(counter.count)
    .execute(executor)
    .await?;

    Ok(())
}
