//! Notify stage: per-client grouping, rendering and dispatch.

pub mod batches;
pub mod dispatcher;
pub mod render;
pub mod smtp;

pub use batches::{ClientBatch, ClientBatches};
pub use dispatcher::{DispatchOutcome, Dispatcher, Recipients};
pub use render::MessageRenderer;
pub use smtp::SmtpMailer;

use crate::error::DispatchError;
use async_trait::async_trait;

/// One outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    /// HTML body
    pub body: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
}

/// Outbound message transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send one message to every listed recipient.
    ///
    /// Returning `Ok` means the transport accepted the message.
    async fn send(&self, notification: &Notification) -> Result<(), DispatchError>;
}
