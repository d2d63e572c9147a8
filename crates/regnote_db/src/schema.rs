//! Ledger schema creation.
//!
//! All CREATE TABLE statements live here - single source of truth.

use crate::error::Result;
use crate::LedgerDb;
use tracing::info;

impl LedgerDb {
    /// Ensure all tables exist.
    ///
    /// Connection pragmas (WAL, synchronous, foreign keys) are set per
    /// connection in [`LedgerDb::open`].
    pub(crate) async fn ensure_schema(&self) -> Result<()> {
        self.create_file_tables().await?;
        self.create_result_tables().await?;
        self.create_contact_tables().await?;

        info!("Ledger schema verified");
        Ok(())
    }

    async fn create_file_tables(&self) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS files (
                name TEXT PRIMARY KEY,
                is_processed INTEGER NOT NULL DEFAULT 0,
                first_seen_at INTEGER NOT NULL,
                processed_at INTEGER
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_files_processed ON files(is_processed)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn create_result_tables(&self) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                file_name TEXT NOT NULL REFERENCES files(name),
                accession TEXT NOT NULL,
                test_code TEXT NOT NULL,
                test_value TEXT NOT NULL,
                captured_at INTEGER NOT NULL,
                is_delivered INTEGER NOT NULL DEFAULT 0,
                delivered_at INTEGER
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_results_pending ON results(is_delivered, test_code)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_results_accession ON results(accession)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_results_file ON results(file_name)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn create_contact_tables(&self) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS client_contacts (
                type_id TEXT NOT NULL,
                address TEXT NOT NULL,
                client_id TEXT NOT NULL,
                UNIQUE(client_id, type_id, address)
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_client_contacts_client ON client_contacts(client_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
