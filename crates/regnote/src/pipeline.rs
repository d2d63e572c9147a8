//! Batch run: ingest, reconcile, notify.
//!
//! Each stage hands off through the ledger. A record only advances once the
//! write of the previous stage is durable, so a run interrupted at any point
//! resumes correctly on the next invocation.

use crate::config::{Config, TrackedTest};
use crate::error::PipelineError;
use crate::ingest::{FileScanner, ResultExtractor};
use crate::notify::{ClientBatches, Dispatcher, Mailer, MessageRenderer};
use crate::reconcile::{Reconciler, RecordStore};
use chrono::NaiveDate;
use regnote_db::LedgerStore;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// The parts of [`Config`] a run needs.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub source_directory: PathBuf,
    pub tracked_tests: Vec<TrackedTest>,
    pub on_hold_state: String,
    pub subject_template: String,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            source_directory: config.source_directory.clone(),
            tracked_tests: config.tracked_tests.clone(),
            on_hold_state: config.record_store.on_hold_state.clone(),
            subject_template: config.mail.subject_template.clone(),
        }
    }
}

/// Counters for one run, logged on completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub files_seen: usize,
    pub files_registered: u64,
    pub files_extracted: usize,
    /// Files left pending because they could not be parsed
    pub files_failed: usize,
    pub results_extracted: usize,
    /// Undelivered results considered for reconciliation
    pub results_pending: usize,
    /// Pending rows identical to one already looked up this run
    pub duplicates: usize,
    pub reconciled: usize,
    pub unmatched: usize,
    pub notifications_sent: usize,
    pub clients_skipped: usize,
    pub accessions_delivered: usize,
}

/// One configured run over explicit handles.
pub struct Pipeline<'a> {
    ledger: &'a dyn LedgerStore,
    records: &'a dyn RecordStore,
    mailer: &'a dyn Mailer,
    settings: PipelineSettings,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        ledger: &'a dyn LedgerStore,
        records: &'a dyn RecordStore,
        mailer: &'a dyn Mailer,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            ledger,
            records,
            mailer,
            settings,
        }
    }

    /// Run every stage to completion. `run_date` becomes the report date.
    pub async fn run(&self, run_date: NaiveDate) -> Result<RunSummary, PipelineError> {
        let mut summary = RunSummary::default();

        self.ingest(&mut summary).await?;
        let batches = self.reconcile(run_date, &mut summary).await?;
        self.notify(&batches, &mut summary).await?;

        info!(
            files_seen = summary.files_seen,
            files_registered = summary.files_registered,
            files_extracted = summary.files_extracted,
            files_failed = summary.files_failed,
            results_extracted = summary.results_extracted,
            results_pending = summary.results_pending,
            duplicates = summary.duplicates,
            reconciled = summary.reconciled,
            unmatched = summary.unmatched,
            notifications_sent = summary.notifications_sent,
            clients_skipped = summary.clients_skipped,
            accessions_delivered = summary.accessions_delivered,
            "Run complete"
        );

        Ok(summary)
    }

    async fn ingest(&self, summary: &mut RunSummary) -> Result<(), PipelineError> {
        let scanner = FileScanner::new(&self.settings.source_directory);
        let scanned = scanner.scan(self.ledger).await?;
        summary.files_seen = scanned.seen;
        summary.files_registered = scanned.registered;

        let extractor = ResultExtractor::new(&self.settings.tracked_tests);
        for file in self.ledger.pending_files().await? {
            let rows = match extractor.extract(Path::new(&file.path)) {
                Ok(rows) => rows,
                Err(err) => {
                    error!(path = %file.path, error = %err, "Skipping unreadable result file; it stays pending");
                    summary.files_failed += 1;
                    continue;
                }
            };

            self.ledger.commit_extraction(&file.path, &rows).await?;
            info!(path = %file.path, results = rows.len(), "File processed");

            summary.files_extracted += 1;
            summary.results_extracted += rows.len();
        }

        Ok(())
    }

    async fn reconcile(
        &self,
        run_date: NaiveDate,
        summary: &mut RunSummary,
    ) -> Result<ClientBatches, PipelineError> {
        let reconciler = Reconciler::new(
            self.records,
            &self.settings.tracked_tests,
            &self.settings.on_hold_state,
            run_date,
        );

        let mut batches = ClientBatches::new();
        for test in &self.settings.tracked_tests {
            let pending = self.ledger.pending_results(&test.code).await?;
            summary.results_pending += pending.len();

            // Same accession, code and value (a re-dropped file): one lookup,
            // one table row. Delivery marks cover every copy.
            let mut seen = HashSet::new();
            for raw in &pending {
                let key = (raw.accession.as_str(), raw.test_value.as_str());
                if !seen.insert(key) {
                    debug!(accession = %raw.accession, test_code = %raw.test_code, "Merging duplicate pending result");
                    summary.duplicates += 1;
                    continue;
                }

                match reconciler.reconcile(raw).await? {
                    Some(record) => {
                        summary.reconciled += 1;
                        batches.push(record);
                    }
                    None => summary.unmatched += 1,
                }
            }
        }

        info!(
            pending = summary.results_pending,
            duplicates = summary.duplicates,
            reconciled = summary.reconciled,
            unmatched = summary.unmatched,
            clients = batches.len(),
            records = batches.record_count(),
            "Reconciliation finished"
        );

        Ok(batches)
    }

    async fn notify(
        &self,
        batches: &ClientBatches,
        summary: &mut RunSummary,
    ) -> Result<(), PipelineError> {
        if batches.is_empty() {
            info!("Nothing to notify");
            return Ok(());
        }

        let contacts = self.ledger.client_contacts().await?;
        let renderer = MessageRenderer::new(self.settings.subject_template.as_str());
        let dispatcher = Dispatcher::new(self.mailer, &renderer, &contacts);

        let outcome = dispatcher.dispatch(batches, self.ledger).await?;
        summary.notifications_sent = outcome.notifications_sent;
        summary.clients_skipped = outcome.clients_skipped;
        summary.accessions_delivered = outcome.accessions_delivered;

        Ok(())
    }
}
