//! Test doubles shared by the unit test modules.

use async_trait::async_trait;
use axum::Router;
use bytes::Bytes;
use std::sync::Mutex;
use std::time::Duration;

use crate::notifier::{MessageReceipt, Notifier, NotifyError, NotifyResult, OutboundMessage};
use crate::storage::{StorageClient, StorageError, StorageResult, UploadOptions, UploadReceipt};

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn spawn_mock(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// How a mock provider should answer.
#[derive(Debug, Clone)]
pub enum Behavior {
    Succeed,
    /// Succeed but leave both URLs out of the receipt.
    OmitUrl,
    Fail,
    Hang,
}

/// In-memory storage that records every object it is given.
pub struct MockStorage {
    behavior: Behavior,
    pub stored: Mutex<Vec<(Bytes, UploadOptions)>>,
}

impl MockStorage {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            stored: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.stored.lock().unwrap().len()
    }
}

#[async_trait]
impl StorageClient for MockStorage {
    async fn upload(&self, data: Bytes, options: UploadOptions) -> StorageResult<UploadReceipt> {
        let id = options.identifier.clone().unwrap_or_else(|| "generated".into());
        self.stored.lock().unwrap().push((data, options));

        match self.behavior {
            Behavior::Succeed => Ok(UploadReceipt {
                url: Some(format!("http://files.example/{id}")),
                secure_url: Some(format!("https://files.example/{id}")),
                public_id: Some(id),
            }),
            Behavior::OmitUrl => Ok(UploadReceipt {
                public_id: Some(id),
                ..Default::default()
            }),
            Behavior::Fail => Err(StorageError::Rejected {
                status: 500,
                message: "disk on fire".into(),
            }),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                unreachable!("mock storage should have been cancelled")
            }
        }
    }
}

/// Messaging double that records every message it is asked to send.
pub struct MockNotifier {
    behavior: Behavior,
    pub sent: Mutex<Vec<OutboundMessage>>,
}

impl MockNotifier {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, message: OutboundMessage) -> NotifyResult<MessageReceipt> {
        self.sent.lock().unwrap().push(message);

        match self.behavior {
            Behavior::Fail => Err(NotifyError::Rejected {
                status: 400,
                message: "recipient not opted in".into(),
            }),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                unreachable!("mock notifier should have been cancelled")
            }
            _ => Ok(MessageReceipt {
                id: "SM-test".into(),
            }),
        }
    }
}
