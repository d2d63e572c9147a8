//! File and result operations.

use crate::error::{LedgerError, Result};
use crate::store::LedgerStore;
use crate::types::*;
use crate::LedgerDb;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;
use tracing::debug;

#[async_trait]
impl LedgerStore for LedgerDb {
    async fn register_files(&self, paths: &[String]) -> Result<u64> {
        let now = Self::now_millis();
        let mut tx = self.pool.begin().await?;
        let mut added = 0u64;

        for path in paths {
            let result = sqlx::query(
                r#"
                INSERT INTO files (name, is_processed, first_seen_at)
                VALUES (?, 0, ?)
                ON CONFLICT(name) DO NOTHING
                "#,
            )
            .bind(path)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            added += result.rows_affected();
        }

        tx.commit().await?;
        debug!(seen = paths.len(), added, "Registered files");
        Ok(added)
    }

    async fn pending_files(&self) -> Result<Vec<FileRecord>> {
        let rows = sqlx::query(
            "SELECT name, is_processed, first_seen_at, processed_at FROM files WHERE is_processed = 0 ORDER BY first_seen_at, name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_file).collect())
    }

    async fn mark_file_processed(&self, path: &str) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        mark_processed_on(&mut *conn, path).await
    }

    async fn insert_raw_result(&self, result: &RawResult) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        insert_result_on(&mut *conn, result).await
    }

    async fn commit_extraction(&self, path: &str, results: &[RawResult]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for result in results {
            if result.source_file != path {
                return Err(LedgerError::invalid_state(format!(
                    "Result for {} committed under {}",
                    result.source_file, path
                )));
            }
            insert_result_on(&mut *tx, result).await?;
        }
        mark_processed_on(&mut *tx, path).await?;
        tx.commit().await?;

        debug!(path, results = results.len(), "Committed extraction");
        Ok(())
    }

    async fn pending_results(&self, test_code: &str) -> Result<Vec<RawResult>> {
        let rows = sqlx::query(
            r#"
            SELECT id, file_name, accession, test_code, test_value, captured_at, is_delivered
            FROM results
            WHERE is_delivered = 0 AND test_code = ?
            ORDER BY id
            "#,
        )
        .bind(test_code)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_result).collect())
    }

    async fn mark_delivered(&self, accession: &str) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE results SET is_delivered = 1, delivered_at = ? WHERE accession = ? AND is_delivered = 0",
        )
        .bind(Self::now_millis())
        .bind(accession)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn client_contacts(&self) -> Result<Vec<ClientContact>> {
        self.list_client_contacts(None).await
    }
}

impl LedgerDb {
    /// All results extracted from one file, delivered or not.
    pub async fn results_for_file(&self, path: &str) -> Result<Vec<RawResult>> {
        let rows = sqlx::query(
            r#"
            SELECT id, file_name, accession, test_code, test_value, captured_at, is_delivered
            FROM results
            WHERE file_name = ?
            ORDER BY id
            "#,
        )
        .bind(path)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_result).collect())
    }

    /// Look up one file record.
    pub async fn get_file(&self, path: &str) -> Result<Option<FileRecord>> {
        let row = sqlx::query(
            "SELECT name, is_processed, first_seen_at, processed_at FROM files WHERE name = ?",
        )
        .bind(path)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_file))
    }

    /// Ledger counters.
    pub async fn stats(&self) -> Result<LedgerStats> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM files) as files_total,
                (SELECT COUNT(*) FROM files WHERE is_processed = 0) as files_pending,
                (SELECT COUNT(*) FROM results) as results_total,
                (SELECT COUNT(*) FROM results WHERE is_delivered = 0) as results_pending,
                (SELECT COUNT(*) FROM client_contacts) as contacts_total
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let files_total = row.get::<i64, _>("files_total") as u64;
        let files_pending = row.get::<i64, _>("files_pending") as u64;
        let results_total = row.get::<i64, _>("results_total") as u64;
        let results_pending = row.get::<i64, _>("results_pending") as u64;

        Ok(LedgerStats {
            files_total,
            files_pending,
            files_processed: files_total - files_pending,
            results_total,
            results_pending,
            results_delivered: results_total - results_pending,
            contacts_total: row.get::<i64, _>("contacts_total") as u64,
        })
    }
}

async fn insert_result_on(conn: &mut SqliteConnection, result: &RawResult) -> Result<i64> {
    // The EXISTS guard keeps rows from landing on a processed (or unknown) file.
    let inserted = sqlx::query(
        r#"
        INSERT INTO results (file_name, accession, test_code, test_value, captured_at, is_delivered)
        SELECT ?, ?, ?, ?, ?, 0
        WHERE EXISTS (SELECT 1 FROM files WHERE name = ? AND is_processed = 0)
        "#,
    )
    .bind(&result.source_file)
    .bind(&result.accession)
    .bind(&result.test_code)
    .bind(&result.test_value)
    .bind(result.captured_at.timestamp_millis())
    .bind(&result.source_file)
    .execute(&mut *conn)
    .await?;

    if inserted.rows_affected() == 0 {
        return Err(LedgerError::invalid_state(format!(
            "Cannot add result {} to {}: file unknown or already processed",
            result.accession, result.source_file
        )));
    }

    Ok(inserted.last_insert_rowid())
}

async fn mark_processed_on(conn: &mut SqliteConnection, path: &str) -> Result<()> {
    let updated = sqlx::query(
        "UPDATE files SET is_processed = 1, processed_at = ? WHERE name = ? AND is_processed = 0",
    )
    .bind(LedgerDb::now_millis())
    .bind(path)
    .execute(&mut *conn)
    .await?;

    if updated.rows_affected() == 0 {
        let known = sqlx::query("SELECT 1 FROM files WHERE name = ?")
            .bind(path)
            .fetch_optional(&mut *conn)
            .await?;
        if known.is_none() {
            return Err(LedgerError::not_found(format!("File not registered: {}", path)));
        }
    }

    Ok(())
}

fn row_to_file(row: &SqliteRow) -> FileRecord {
    let first_seen_at: i64 = row.get("first_seen_at");
    let processed_at: Option<i64> = row.get("processed_at");

    FileRecord {
        path: row.get("name"),
        processed: row.get("is_processed"),
        first_seen_at: LedgerDb::millis_to_datetime(first_seen_at),
        processed_at: processed_at.map(LedgerDb::millis_to_datetime),
    }
}

fn row_to_result(row: &SqliteRow) -> RawResult {
    let captured_at: i64 = row.get("captured_at");

    RawResult {
        id: Some(row.get("id")),
        source_file: row.get("file_name"),
        accession: row.get("accession"),
        test_code: row.get("test_code"),
        test_value: row.get("test_value"),
        captured_at: LedgerDb::millis_to_datetime(captured_at),
        delivered: row.get("is_delivered"),
    }
}
