//! SQLite persistence layer: pool construction, embedded migrations, row
//! models, and repositories.
//!
//! Every component that touches the store goes through [`DbPool`]. Workers
//! open their own pool (they share no in-memory state with the dispatcher);
//! the dispatcher and CLI share one.

pub mod models;
pub mod repositories;

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};

/// Database connection pool type alias.
pub type DbPool = Pool<Sqlite>;

/// Default connection pool size.
const DEFAULT_POOL_SIZE: u32 = 10;

/// How long a statement waits for the SQLite write lock before failing.
const BUSY_TIMEOUT_MS: u64 = 30_000;

/// Create a connection pool with WAL journaling and a busy timeout.
///
/// WAL mode lets readers proceed while a writer holds the lock, which the
/// parallel executor relies on: every worker opens its own pool against the
/// same database file.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    create_pool_with_size(database_url, DEFAULT_POOL_SIZE).await
}

/// Create a connection pool with an explicit size.
pub async fn create_pool_with_size(
    database_url: &str,
    max_connections: u32,
) -> Result<DbPool, sqlx::Error> {
    let connect_options = SqliteConnectOptions::from_str(database_url)?
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))
        .foreign_keys(true)
        .create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect_with(connect_options)
        .await
}

/// Apply all pending migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::debug!("database migrations up to date");
    Ok(())
}

/// Cheap connectivity probe.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
