//! In-memory grouping of reconciled records by client.

use crate::reconcile::ReconciledRecord;
use std::collections::HashMap;

/// Records for one client, in reconciliation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientBatch {
    pub client_id: String,
    pub client_name: String,
    pub records: Vec<ReconciledRecord>,
}

impl ClientBatch {
    /// Distinct accessions in first-seen order.
    pub fn accessions(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for record in &self.records {
            if !seen.contains(&record.accession.as_str()) {
                seen.push(record.accession.as_str());
            }
        }
        seen
    }
}

/// Insertion-ordered map of client id to batch, rebuilt every run.
#[derive(Debug, Default)]
pub struct ClientBatches {
    batches: Vec<ClientBatch>,
    index: HashMap<String, usize>,
}

impl ClientBatches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to its client's batch, opening the batch on first sight.
    pub fn push(&mut self, record: ReconciledRecord) {
        match self.index.get(&record.client_id) {
            Some(&pos) => self.batches[pos].records.push(record),
            None => {
                self.index.insert(record.client_id.clone(), self.batches.len());
                self.batches.push(ClientBatch {
                    client_id: record.client_id.clone(),
                    client_name: record.client_name.clone(),
                    records: vec![record],
                });
            }
        }
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn record_count(&self) -> usize {
        self.batches.iter().map(|b| b.records.len()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClientBatch> {
        self.batches.iter()
    }
}
