//! External record store contract.

use crate::error::RecordStoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Parameters of one demographic lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuery<'a> {
    pub accession: &'a str,
    /// Test code as the external store knows it (e.g. `950Z`)
    pub external_code: &'a str,
    /// Result state to exclude (held results)
    pub exclude_state: &'a str,
}

/// Patient and report fields as returned by the external store, unnormalized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalRecord {
    pub accession: String,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: String,
    /// Raw date of birth text
    pub dob: String,
    pub client_id: String,
    pub client_name: String,
    pub physician_name: String,
    /// The store's own result state; informational only
    pub result_state: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub phone: String,
}

/// Lookup of patient demographics for a lab accession.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Find the record for an accession and test code.
    ///
    /// `Ok(None)` is a miss (not yet reported, or on hold); errors are reserved
    /// for connection and query failures.
    async fn find_record(
        &self,
        query: &RecordQuery<'_>,
    ) -> Result<Option<ExternalRecord>, RecordStoreError>;
}
