//! RegNote - lab result notifier
//!
//! Scans a drop directory for result files, extracts tracked test results
//! into the ledger, reconciles them against the external record store and
//! sends one notification per client.

pub mod config;
pub mod error;
pub mod ingest;
pub mod notify;
pub mod pipeline;
pub mod reconcile;

pub use config::{Config, MailConfig, MailTls, RecordStoreConfig, TrackedTest};
pub use error::{DirectoryError, DispatchError, ExtractionError, PipelineError, RecordStoreError};
pub use notify::{Mailer, Notification, SmtpMailer};
pub use pipeline::{Pipeline, PipelineSettings, RunSummary};
pub use reconcile::{ExternalRecord, MssqlRecordStore, ReconciledRecord, RecordQuery, RecordStore};
