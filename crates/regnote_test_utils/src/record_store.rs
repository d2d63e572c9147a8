//! In-memory external record store.

use async_trait::async_trait;
use regnote::{ExternalRecord, RecordQuery, RecordStore, RecordStoreError};
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct Entry {
    external_code: String,
    record: ExternalRecord,
}

/// Record store holding rows keyed by accession and external test code.
///
/// Honors the excluded result state the same way the SQL lookup does.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    entries: Mutex<Vec<Entry>>,
    failure: Mutex<Option<String>>,
    lookups: Mutex<usize>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a row for an external test code. Later rows win on lookup.
    pub fn insert(&self, external_code: &str, record: ExternalRecord) {
        self.entries.lock().unwrap().push(Entry {
            external_code: external_code.to_string(),
            record,
        });
    }

    /// Make every following lookup fail.
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn lookups(&self) -> usize {
        *self.lookups.lock().unwrap()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn find_record(
        &self,
        query: &RecordQuery<'_>,
    ) -> Result<Option<ExternalRecord>, RecordStoreError> {
        *self.lookups.lock().unwrap() += 1;

        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(RecordStoreError::Unavailable(message));
        }

        let entries = self.entries.lock().unwrap();
        Ok(entries
            .iter()
            .rev()
            .find(|e| {
                e.record.accession == query.accession
                    && e.external_code == query.external_code
                    && e.record.result_state != query.exclude_state
            })
            .map(|e| e.record.clone()))
    }
}
