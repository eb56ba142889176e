//! Object storage capability.
//!
//! The orchestrator only sees [`StorageClient`]; the Cloudinary client in
//! `providers` is the production implementation.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt, stream};
use serde::Deserialize;
use std::pin::Pin;
use thiserror::Error;

/// Chunk size used when feeding an in-memory payload through the streaming API.
pub const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// A boxed stream of bytes for streaming uploads.
pub type ByteStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("storage provider rejected upload ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("storage provider returned no {0}")]
    MissingUrl(&'static str),
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// How the provider should treat the uploaded bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentKind {
    /// Let the provider detect the type.
    #[default]
    Auto,
    /// Opaque bytes, stored and served as-is.
    Raw,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Auto => "auto",
            ContentKind::Raw => "raw",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOptions {
    pub content_kind: ContentKind,
    /// Object identifier; the provider picks one when `None`. Reusing an
    /// identifier overwrites the existing object.
    pub identifier: Option<String>,
}

impl UploadOptions {
    pub fn new(content_kind: ContentKind, identifier: Option<String>) -> Self {
        Self {
            content_kind,
            identifier,
        }
    }
}

/// What the provider reports back after storing an object. Either URL may be
/// absent; callers decide which one they require.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UploadReceipt {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub secure_url: Option<String>,
    #[serde(default)]
    pub public_id: Option<String>,
}

#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Store a complete payload.
    async fn upload(&self, data: Bytes, options: UploadOptions) -> StorageResult<UploadReceipt>;

    /// Store a payload delivered incrementally.
    ///
    /// The default buffers the stream and calls [`StorageClient::upload`].
    async fn upload_stream(
        &self,
        mut chunks: ByteStream,
        options: UploadOptions,
    ) -> StorageResult<UploadReceipt> {
        let mut buffer = BytesMut::new();
        while let Some(chunk) = chunks.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        self.upload(buffer.freeze(), options).await
    }
}

/// Split an in-memory payload into a stream of zero-copy chunks.
pub fn chunked(data: Bytes, chunk_size: usize) -> ByteStream {
    let chunk_size = chunk_size.max(1);
    let chunks: Vec<StorageResult<Bytes>> = (0..data.len())
        .step_by(chunk_size)
        .map(|start| Ok(data.slice(start..(start + chunk_size).min(data.len()))))
        .collect();
    Box::pin(stream::iter(chunks))
}
