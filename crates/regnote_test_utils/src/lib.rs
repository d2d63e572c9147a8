//! RegNote Test Utilities
//!
//! Test doubles for the pipeline's external handles plus fixture helpers.
//!
//! # Usage
//!
//! ```rust,ignore
//! use regnote_test_utils::{external_record, write_result_file, MemoryRecordStore, RecordingMailer};
//!
//! #[tokio::test]
//! async fn test_run() {
//!     let tmp = tempfile::TempDir::new().unwrap();
//!     write_result_file(tmp.path(), "batch1.csv", &[("A1", "C19", "D")]);
//!
//!     let records = MemoryRecordStore::new();
//!     records.insert("950Z", external_record("A1", "100"));
//!     let mailer = RecordingMailer::new();
//!     // build a Pipeline over a LedgerDb and these doubles ...
//! }
//! ```

pub mod fixtures;
pub mod ledger;
pub mod mailer;
pub mod record_store;

pub use fixtures::{external_record, test_settings, write_result_file, RESULT_FILE_HEADER};
pub use ledger::{FaultyLedger, LedgerOp};
pub use mailer::{FailingMailer, RecordingMailer};
pub use record_store::MemoryRecordStore;
