//! Ledger store for RegNote
//!
//! Durable tracking of which source files have been scanned, which test
//! results were extracted from them, and which results have been delivered.
//! Client contact reference data lives in the same database.
//!
//! # Usage
//!
//! ```rust,ignore
//! use regnote_db::{LedgerDb, LedgerStore};
//!
//! let ledger = LedgerDb::open("~/.regnote/regnote.sqlite3").await?;
//! let added = ledger.register_files(&paths).await?;
//! for file in ledger.pending_files().await? {
//!     // extract, then
//!     ledger.commit_extraction(&file.path, &results).await?;
//! }
//! ```

mod contacts;
mod error;
mod ledger;
pub mod lock;
mod schema;
mod store;
mod types;

pub use error::{LedgerError, Result};
pub use lock::{try_lock_exclusive, LockError, RunLockGuard};
pub use store::LedgerStore;
pub use types::*;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// SQLite-backed ledger.
///
/// All reads and writes of the `files`, `results` and `client_contacts`
/// tables go through this type.
#[derive(Clone)]
pub struct LedgerDb {
    pool: SqlitePool,
}

impl LedgerDb {
    /// Open or create a ledger at the given path.
    ///
    /// Creates all tables if they don't exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = Self::connect(options, 5).await?;

        let db = Self { pool };
        db.ensure_schema().await?;

        info!(path = %path.display(), "Ledger opened");

        Ok(db)
    }

    /// Open an existing ledger (fails if not exists).
    pub async fn open_existing(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(LedgerError::not_found(format!(
                "Ledger not found: {}",
                path.display()
            )));
        }

        let pool = Self::connect(SqliteConnectOptions::new().filename(path), 5).await?;

        let db = Self { pool };
        db.ensure_schema().await?;
        Ok(db)
    }

    /// Open a private in-memory ledger.
    ///
    /// A single connection keeps every query on the same memory database.
    pub async fn open_in_memory() -> Result<Self> {
        let pool = Self::connect(SqliteConnectOptions::from_str("sqlite::memory:")?, 1).await?;
        let db = Self { pool };
        db.ensure_schema().await?;
        Ok(db)
    }

    async fn connect(options: SqliteConnectOptions, max_connections: u32) -> Result<SqlitePool> {
        let options = options
            .journal_mode(SqliteJournalMode::Wal)
            // FULL: a committed processed/delivered mark must survive power loss
            .synchronous(SqliteSynchronous::Full)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Ok(pool)
    }

    /// Get the underlying connection pool (escape hatch for complex queries).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the ledger connection.
    pub async fn close(self) {
        self.pool.close().await;
    }
}

// Timestamp utilities
impl LedgerDb {
    /// Current time as milliseconds since Unix epoch.
    pub fn now_millis() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    /// Convert milliseconds to DateTime.
    pub fn millis_to_datetime(millis: i64) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp_millis(millis).unwrap_or_else(chrono::Utc::now)
    }
}
