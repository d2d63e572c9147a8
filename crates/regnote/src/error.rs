//! Error types for the pipeline stages.
//!
//! Every variant of [`PipelineError`] is fatal for the run. Malformed files are
//! the one recoverable case: [`ExtractionError`] is logged and the file is left
//! pending, so it never reaches [`PipelineError`].

use regnote_db::LedgerError;
use std::path::PathBuf;
use thiserror::Error;

/// The source directory could not be listed.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Source directory not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Cannot list source directory {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// A result file could not be parsed.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Malformed row at line {line} of {path}: expected at least {expected} columns, found {found}")]
    MalformedRow {
        path: PathBuf,
        line: u64,
        expected: usize,
        found: usize,
    },
}

/// The external record store failed (distinct from a lookup miss).
#[derive(Debug, Error)]
pub enum RecordStoreError {
    #[error("Record store query failed: {0}")]
    Tds(#[from] tiberius::error::Error),

    #[error("Record store connection failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record store unavailable: {0}")]
    Unavailable(String),
}

/// A notification could not be built or sent.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Cannot build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP transport failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("Mailer unavailable: {0}")]
    Unavailable(String),
}

/// Fatal run failure.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error("Ledger error: {0}")]
    Storage(#[from] LedgerError),

    #[error(transparent)]
    RecordStore(#[from] RecordStoreError),

    #[error("Dispatch to client {client_id} failed: {source}")]
    Dispatch {
        client_id: String,
        #[source]
        source: DispatchError,
    },
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
