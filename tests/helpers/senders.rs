//! Fake email senders

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use EventPass::services::{EmailOutcome, EmailSender, OutgoingEmail};
use EventPass::{EventPassError, Result};

/// Keeps every email it is asked to send
#[derive(Clone, Default)]
pub struct RecordingEmailSender {
    sent: Arc<Mutex<Vec<OutgoingEmail>>>,
}

impl RecordingEmailSender {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send(&self, email: &OutgoingEmail) -> Result<EmailOutcome> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(EmailOutcome::Sent)
    }
}

/// Fails every delivery
#[derive(Clone, Default)]
pub struct FailingEmailSender;

#[async_trait]
impl EmailSender for FailingEmailSender {
    async fn send(&self, _email: &OutgoingEmail) -> Result<EmailOutcome> {
        Err(EventPassError::Email("connection refused".to_string()))
    }
}
