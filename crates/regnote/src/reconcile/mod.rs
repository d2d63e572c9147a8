//! Reconcile stage: join pending raw results with external demographics.

pub mod mssql;
pub mod normalize;
pub mod store;

pub use mssql::MssqlRecordStore;
pub use store::{ExternalRecord, RecordQuery, RecordStore};

use crate::config::TrackedTest;
use crate::error::RecordStoreError;
use chrono::NaiveDate;
use normalize::{format_report_date, interpret_result, normalize_dob, normalize_phone};
use regnote_db::RawResult;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// A raw result merged with external patient data. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciledRecord {
    pub accession: String,
    /// Run date, `MM/DD/YYYY`
    pub report_date: String,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: String,
    /// `YYYY-MM-DD` or `n/a`
    pub dob: String,
    pub client_id: String,
    pub client_name: String,
    pub physician_name: String,
    pub test_code: String,
    pub test_name: String,
    /// Interpreted value of the raw result, not the external store's state
    pub result: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    /// `(NNN)NNN-NNNN` or empty
    pub phone: String,
}

/// Looks up raw results in the record store and normalizes the match.
pub struct Reconciler<'a> {
    store: &'a dyn RecordStore,
    tests: HashMap<&'a str, &'a TrackedTest>,
    on_hold_state: &'a str,
    report_date: String,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        store: &'a dyn RecordStore,
        tracked: &'a [TrackedTest],
        on_hold_state: &'a str,
        run_date: NaiveDate,
    ) -> Self {
        Self {
            store,
            tests: tracked.iter().map(|t| (t.code.as_str(), t)).collect(),
            on_hold_state,
            report_date: format_report_date(run_date),
        }
    }

    /// Reconcile one raw result. `None` means the external store has no
    /// reportable record yet and the result stays pending.
    pub async fn reconcile(
        &self,
        raw: &RawResult,
    ) -> Result<Option<ReconciledRecord>, RecordStoreError> {
        let Some(test) = self.tests.get(raw.test_code.as_str()) else {
            debug!(
                accession = %raw.accession,
                test_code = %raw.test_code,
                "Result code is not tracked; leaving pending"
            );
            return Ok(None);
        };

        let query = RecordQuery {
            accession: &raw.accession,
            external_code: &test.external_code,
            exclude_state: self.on_hold_state,
        };
        let Some(external) = self.store.find_record(&query).await? else {
            debug!(accession = %raw.accession, external_code = %test.external_code, "No external record");
            return Ok(None);
        };

        Ok(Some(self.merge(raw, test, external)))
    }

    fn merge(&self, raw: &RawResult, test: &TrackedTest, external: ExternalRecord) -> ReconciledRecord {
        ReconciledRecord {
            accession: raw.accession.clone(),
            report_date: self.report_date.clone(),
            first_name: external.first_name.trim().to_string(),
            last_name: external.last_name.trim().to_string(),
            middle_name: external.middle_name.trim().to_string(),
            dob: normalize_dob(&external.dob),
            client_id: external.client_id.trim().to_string(),
            client_name: external.client_name.trim().to_string(),
            physician_name: external.physician_name.trim().to_string(),
            test_code: raw.test_code.clone(),
            test_name: test.name.clone(),
            result: interpret_result(&raw.test_value),
            address: external.address.trim().to_string(),
            city: external.city.trim().to_string(),
            state: external.state.trim().to_string(),
            zip: external.zip.trim().to_string(),
            phone: normalize_phone(&external.phone),
        }
    }
}
