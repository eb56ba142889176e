//! Messaging capability used to announce finished report uploads.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("messaging request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("messaging provider rejected message ({status}): {message}")]
    Rejected { status: u16, message: String },
}

pub type NotifyResult<T> = std::result::Result<T, NotifyError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub body: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageReceipt {
    pub id: String,
}

// Fixed sender/recipient pair, taken from configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRoute {
    pub from: String,
    pub to: String,
}

impl MessageRoute {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn message(&self, body: impl Into<String>) -> OutboundMessage {
        OutboundMessage {
            body: body.into(),
            from: self.from.clone(),
            to: self.to.clone(),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: OutboundMessage) -> NotifyResult<MessageReceipt>;
}
