//! Mailer doubles.

use async_trait::async_trait;
use regnote::{DispatchError, Mailer, Notification};
use std::sync::Mutex;

/// Accepts every message and keeps a copy.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, notification: &Notification) -> Result<(), DispatchError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Accepts `succeed_first` messages, then rejects everything.
#[derive(Debug, Default)]
pub struct FailingMailer {
    succeed_first: usize,
    attempts: Mutex<Vec<Notification>>,
}

impl FailingMailer {
    /// Rejects every message.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn after(succeed_first: usize) -> Self {
        Self {
            succeed_first,
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// Every message handed to the mailer, accepted or not.
    pub fn attempts(&self) -> Vec<Notification> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, notification: &Notification) -> Result<(), DispatchError> {
        let mut attempts = self.attempts.lock().unwrap();
        attempts.push(notification.clone());
        if attempts.len() <= self.succeed_first {
            Ok(())
        } else {
            Err(DispatchError::Unavailable("relay refused the message".to_string()))
        }
    }
}
