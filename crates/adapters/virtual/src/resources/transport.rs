//! Transport that logs outbound messages instead of delivering them.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use vigil_app::ports::{
    InboundMessage, NotificationTransport, OutboundMessage, SendReceipt, SmsTransport,
};
use vigil_domain::error::VigilError;
use vigil_domain::time::Timestamp;

/// Usable as SMS, email or push transport.
///
/// Replies can be injected with [`LoggingTransport::inject_reply`] to drive
/// response-matched actions.
pub struct LoggingTransport {
    name: String,
    sent: Mutex<Vec<OutboundMessage>>,
    inbound: Mutex<Vec<InboundMessage>>,
}

impl LoggingTransport {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sent: Mutex::default(),
            inbound: Mutex::default(),
        }
    }

    #[must_use]
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn inject_reply(&self, from: impl Into<String>, body: impl Into<String>, time: Timestamp) {
        self.inbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(InboundMessage {
                body: body.into(),
                from: from.into(),
                time,
            });
    }
}

#[async_trait]
impl NotificationTransport for LoggingTransport {
    async fn send(&self, message: OutboundMessage) -> Result<SendReceipt, VigilError> {
        tracing::info!(
            transport = %self.name,
            to = ?message.to,
            preset = %message.preset,
            with_media = message.media.is_some(),
            "virtual message sent"
        );
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
        Ok(SendReceipt::default())
    }
}

#[async_trait]
impl SmsTransport for LoggingTransport {
    async fn poll(&self, since: Timestamp, from: &str) -> Result<Vec<InboundMessage>, VigilError> {
        let mut messages: Vec<InboundMessage> = self
            .inbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|message| message.from == from && message.time > since)
            .cloned()
            .collect();
        messages.sort_by_key(|message| message.time);
        Ok(messages)
    }
}
