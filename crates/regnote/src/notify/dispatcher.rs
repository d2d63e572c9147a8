//! Sends one notification per client batch and records delivery.
//!
//! Delivery marks are written only after the mailer accepted the message. A
//! send failure aborts the run with the batch still pending, so the next run
//! retries it (at-least-once).

use super::batches::{ClientBatch, ClientBatches};
use super::render::MessageRenderer;
use super::{Mailer, Notification};
use crate::error::PipelineError;
use lettre::Address;
use regnote_db::{ClientContact, ContactKind, LedgerStore};
use tracing::{info, warn};

/// Addresses for one client, split by recipient slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recipients {
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
}

impl Recipients {
    /// Collect the contacts configured for `client_id`.
    ///
    /// Stored addresses that do not parse are skipped, so one bad row cannot
    /// fail the send for the whole client.
    pub fn resolve(contacts: &[ClientContact], client_id: &str) -> Self {
        let mut recipients = Self::default();
        for contact in contacts.iter().filter(|c| c.client_id == client_id) {
            if let Err(err) = contact.address.parse::<Address>() {
                warn!(
                    client_id = %client_id,
                    address = %contact.address,
                    error = %err,
                    "Skipping invalid contact address"
                );
                continue;
            }
            let slot = match contact.kind {
                ContactKind::To => &mut recipients.to,
                ContactKind::Cc => &mut recipients.cc,
                ContactKind::Bcc => &mut recipients.bcc,
            };
            if !slot.contains(&contact.address) {
                slot.push(contact.address.clone());
            }
        }
        recipients
    }

    pub fn is_empty(&self) -> bool {
        self.to.is_empty() && self.cc.is_empty() && self.bcc.is_empty()
    }
}

/// Counts from one dispatch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub notifications_sent: usize,
    /// Clients with no contacts; their results are marked delivered unsent
    pub clients_skipped: usize,
    pub accessions_delivered: usize,
}

pub struct Dispatcher<'a> {
    mailer: &'a dyn Mailer,
    renderer: &'a MessageRenderer,
    contacts: &'a [ClientContact],
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        mailer: &'a dyn Mailer,
        renderer: &'a MessageRenderer,
        contacts: &'a [ClientContact],
    ) -> Self {
        Self {
            mailer,
            renderer,
            contacts,
        }
    }

    /// Dispatch every batch in order. Stops at the first failure.
    pub async fn dispatch(
        &self,
        batches: &ClientBatches,
        ledger: &dyn LedgerStore,
    ) -> Result<DispatchOutcome, PipelineError> {
        let mut outcome = DispatchOutcome::default();

        for batch in batches.iter() {
            let recipients = Recipients::resolve(self.contacts, &batch.client_id);

            if recipients.is_empty() {
                warn!(
                    client_id = %batch.client_id,
                    client_name = %batch.client_name,
                    records = batch.records.len(),
                    "No contacts configured for client; marking delivered without sending"
                );
                outcome.accessions_delivered += mark_batch_delivered(batch, ledger).await?;
                outcome.clients_skipped += 1;
                continue;
            }

            let notification = Notification {
                subject: self.renderer.subject(batch),
                body: self.renderer.body(batch),
                to: recipients.to,
                cc: recipients.cc,
                bcc: recipients.bcc,
            };

            self.mailer
                .send(&notification)
                .await
                .map_err(|source| PipelineError::Dispatch {
                    client_id: batch.client_id.clone(),
                    source,
                })?;

            info!(
                client_id = %batch.client_id,
                records = batch.records.len(),
                to = notification.to.len(),
                cc = notification.cc.len(),
                bcc = notification.bcc.len(),
                "Notification sent"
            );

            outcome.accessions_delivered += mark_batch_delivered(batch, ledger).await?;
            outcome.notifications_sent += 1;
        }

        Ok(outcome)
    }
}

async fn mark_batch_delivered(
    batch: &ClientBatch,
    ledger: &dyn LedgerStore,
) -> Result<usize, PipelineError> {
    let accessions = batch.accessions();
    for accession in &accessions {
        ledger.mark_delivered(accession).await?;
    }
    Ok(accessions.len())
}
