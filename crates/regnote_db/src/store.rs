//! Ledger contract used by the pipeline.
//!
//! The pipeline only sees this trait, so tests can substitute a ledger that
//! fails on demand. [`LedgerDb`](crate::LedgerDb) is the production
//! implementation.

use crate::error::Result;
use crate::types::{ClientContact, FileRecord, RawResult};
use async_trait::async_trait;

/// Durable tracking of files, extracted results and their delivery status.
///
/// Assumes a single writer: runs are serialized with [`crate::lock`].
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Register every path not already known. Known paths are left untouched.
    ///
    /// Returns the number of newly registered paths.
    async fn register_files(&self, paths: &[String]) -> Result<u64>;

    /// All files not yet marked processed, oldest first.
    async fn pending_files(&self) -> Result<Vec<FileRecord>>;

    /// Mark a file processed. Marking twice is harmless.
    async fn mark_file_processed(&self, path: &str) -> Result<()>;

    /// Append one extracted result.
    ///
    /// Rejected with `InvalidState` when the owning file is unknown or
    /// already processed.
    async fn insert_raw_result(&self, result: &RawResult) -> Result<i64>;

    /// Persist every result of a file, then mark the file processed.
    ///
    /// Rows are written before the mark so a crash in between re-extracts the
    /// file instead of losing rows. Implementations that can do both in one
    /// transaction should override this.
    async fn commit_extraction(&self, path: &str, results: &[RawResult]) -> Result<()> {
        for result in results {
            self.insert_raw_result(result).await?;
        }
        self.mark_file_processed(path).await
    }

    /// Undelivered results for one test code, in extraction order.
    async fn pending_results(&self, test_code: &str) -> Result<Vec<RawResult>>;

    /// Mark every result with this accession delivered. Idempotent.
    ///
    /// Returns the number of results that changed state.
    async fn mark_delivered(&self, accession: &str) -> Result<u64>;

    /// Client contact reference data.
    async fn client_contacts(&self) -> Result<Vec<ClientContact>>;
}
