//! Ledger entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Files
// ============================================================================

/// A source file known to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Full path of the file; unique key
    pub path: String,
    /// Set once every qualifying row of the file has been committed
    pub processed: bool,
    pub first_seen_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Results
// ============================================================================

/// A test record extracted from a source file, awaiting notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResult {
    /// Ledger row id (`None` until inserted)
    pub id: Option<i64>,
    /// Path of the file the row came from
    pub source_file: String,
    pub accession: String,
    pub test_code: String,
    /// Raw result code as it appears in the file (e.g. `D`, `ND`)
    pub test_value: String,
    pub captured_at: DateTime<Utc>,
    pub delivered: bool,
}

impl RawResult {
    /// Build a not-yet-persisted result captured now.
    pub fn new(
        source_file: impl Into<String>,
        accession: impl Into<String>,
        test_code: impl Into<String>,
        test_value: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            source_file: source_file.into(),
            accession: accession.into(),
            test_code: test_code.into(),
            test_value: test_value.into(),
            captured_at: Utc::now(),
            delivered: false,
        }
    }
}

// ============================================================================
// Client contacts
// ============================================================================

/// Recipient slot of a client contact address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactKind {
    /// Primary recipient
    To,
    /// Copy
    Cc,
    /// Blind copy
    Bcc,
}

impl ContactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::To => "to",
            Self::Cc => "cc",
            Self::Bcc => "bcc",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "to" => Some(Self::To),
            "cc" => Some(Self::Cc),
            "bcc" => Some(Self::Bcc),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContactKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown contact kind '{}' (expected to, cc or bcc)", s))
    }
}

/// An email address configured for a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContact {
    pub kind: ContactKind,
    pub address: String,
    pub client_id: String,
}

impl ClientContact {
    pub fn new(kind: ContactKind, address: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            kind,
            address: address.into(),
            client_id: client_id.into(),
        }
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Ledger counters for the `status` command and run summaries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStats {
    pub files_total: u64,
    pub files_pending: u64,
    pub files_processed: u64,
    pub results_total: u64,
    pub results_pending: u64,
    pub results_delivered: u64,
    pub contacts_total: u64,
}
