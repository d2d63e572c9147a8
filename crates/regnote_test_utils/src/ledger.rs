//! Ledger fault injection.

use async_trait::async_trait;
use regnote_db::{
    ClientContact, FileRecord, LedgerDb, LedgerError, LedgerStore, RawResult, Result,
};
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::debug;

/// Ledger operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerOp {
    RegisterFiles,
    PendingFiles,
    MarkFileProcessed,
    InsertRawResult,
    CommitExtraction,
    PendingResults,
    MarkDelivered,
    ClientContacts,
}

/// A real [`LedgerDb`] whose chosen operations fail with
/// `LedgerError::Unavailable` instead of touching the database.
pub struct FaultyLedger {
    inner: LedgerDb,
    failing: Mutex<HashSet<LedgerOp>>,
}

impl FaultyLedger {
    pub fn new(inner: LedgerDb) -> Self {
        Self {
            inner,
            failing: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail_on(&self, op: LedgerOp) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    /// The wrapped ledger, for assertions.
    pub fn inner(&self) -> &LedgerDb {
        &self.inner
    }

    fn check(&self, op: LedgerOp) -> Result<()> {
        if self.failing.lock().unwrap().contains(&op) {
            debug!(?op, "Injected ledger failure");
            return Err(LedgerError::unavailable(format!("injected failure in {:?}", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for FaultyLedger {
    async fn register_files(&self, paths: &[String]) -> Result<u64> {
        self.check(LedgerOp::RegisterFiles)?;
        self.inner.register_files(paths).await
    }

    async fn pending_files(&self) -> Result<Vec<FileRecord>> {
        self.check(LedgerOp::PendingFiles)?;
        self.inner.pending_files().await
    }

    async fn mark_file_processed(&self, path: &str) -> Result<()> {
        self.check(LedgerOp::MarkFileProcessed)?;
        self.inner.mark_file_processed(path).await
    }

    async fn insert_raw_result(&self, result: &RawResult) -> Result<i64> {
        self.check(LedgerOp::InsertRawResult)?;
        self.inner.insert_raw_result(result).await
    }

    async fn commit_extraction(&self, path: &str, results: &[RawResult]) -> Result<()> {
        self.check(LedgerOp::CommitExtraction)?;
        self.inner.commit_extraction(path, results).await
    }

    async fn pending_results(&self, test_code: &str) -> Result<Vec<RawResult>> {
        self.check(LedgerOp::PendingResults)?;
        self.inner.pending_results(test_code).await
    }

    async fn mark_delivered(&self, accession: &str) -> Result<u64> {
        self.check(LedgerOp::MarkDelivered)?;
        self.inner.mark_delivered(accession).await
    }

    async fn client_contacts(&self) -> Result<Vec<ClientContact>> {
        self.check(LedgerOp::ClientContacts)?;
        self.inner.client_contacts().await
    }
}
