//! Upload pipeline: validate, store, then (for reports) notify.
//!
//! Each provider call runs under its own deadline. Steps never overlap and
//! nothing is retried. A report whose notification fails keeps its stored
//! object; the caller only sees the failure.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::metrics::{PIPELINE_OUTCOMES, PROVIDER_LATENCY};
use crate::models::{UploadRequest, UploadResult};
use crate::notifier::{MessageRoute, Notifier, NotifyError};
use crate::storage::{
    ContentKind, STREAM_CHUNK_SIZE, StorageClient, StorageError, UploadOptions, chunked,
};

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Provider step that can time out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Storage,
    Notification,
}

impl Step {
    fn as_str(&self) -> &'static str {
        match self {
            Step::Storage => "storage",
            Step::Notification => "notification",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid upload: {0}")]
    Validation(&'static str),

    #[error("upload failed: {0}")]
    Upload(#[source] StorageError),

    #[error("notification failed: {0}")]
    Notification(#[source] NotifyError),

    #[error("{step} call timed out after {after:?}")]
    Timeout { step: Step, after: Duration },
}

impl PipelineError {
    fn outcome(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "invalid",
            PipelineError::Upload(_) => "upload_failed",
            PipelineError::Notification(_) => "notify_failed",
            PipelineError::Timeout { .. } => "timeout",
        }
    }
}

pub fn report_message(url: &str) -> String {
    format!("Here is the approved reports CSV file: {url}")
}

#[derive(Clone)]
pub struct UploadOrchestrator {
    storage: Arc<dyn StorageClient>,
    notifier: Arc<dyn Notifier>,
    route: MessageRoute,
    call_timeout: Duration,
}

impl UploadOrchestrator {
    pub fn new(
        storage: Arc<dyn StorageClient>,
        notifier: Arc<dyn Notifier>,
        route: MessageRoute,
    ) -> Self {
        Self {
            storage,
            notifier,
            route,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Plain upload: store the bytes and hand back the provider URL.
    pub async fn upload_file(&self, req: UploadRequest) -> Result<UploadResult, PipelineError> {
        let result = self.run_upload_file(req).await;
        record("file", &result);
        result
    }

    /// Report upload: stream the file under its own name as a raw object, then
    /// send the fixed notification carrying its URL.
    pub async fn upload_report(&self, req: UploadRequest) -> Result<UploadResult, PipelineError> {
        let result = self.run_upload_report(req).await;
        record("report", &result);
        result
    }

    async fn run_upload_file(&self, req: UploadRequest) -> Result<UploadResult, PipelineError> {
        if req.file_bytes.is_empty() {
            return Err(PipelineError::Validation("file content is required"));
        }

        let options = UploadOptions::new(ContentKind::Auto, req.destination_label());
        let receipt = self
            .bounded(Step::Storage, self.storage.upload(req.file_bytes, options))
            .await?
            .map_err(PipelineError::Upload)?;

        let remote_url = receipt
            .url
            .ok_or(PipelineError::Upload(StorageError::MissingUrl("url")))?;

        tracing::info!(url = %remote_url, public_id = ?receipt.public_id, "File uploaded");
        Ok(UploadResult { remote_url })
    }

    async fn run_upload_report(&self, req: UploadRequest) -> Result<UploadResult, PipelineError> {
        let file_name = req
            .file_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or(PipelineError::Validation("file name is required"))?
            .to_string();
        if req.file_bytes.is_empty() {
            return Err(PipelineError::Validation("file content is required"));
        }

        let options = UploadOptions::new(ContentKind::Raw, Some(file_name.clone()));
        let chunks = chunked(req.file_bytes, STREAM_CHUNK_SIZE);
        let receipt = self
            .bounded(Step::Storage, self.storage.upload_stream(chunks, options))
            .await?
            .map_err(PipelineError::Upload)?;

        let remote_url = receipt
            .secure_url
            .ok_or(PipelineError::Upload(StorageError::MissingUrl("secure_url")))?;

        tracing::info!(file_name = %file_name, url = %remote_url, "Report uploaded");

        let message = self.route.message(report_message(&remote_url));
        let sent = match self
            .bounded(Step::Notification, self.notifier.send(message))
            .await
        {
            Ok(Ok(receipt)) => receipt,
            Ok(Err(err)) => {
                tracing::warn!(url = %remote_url, "Report stored but notification failed");
                return Err(PipelineError::Notification(err));
            }
            Err(err) => {
                tracing::warn!(url = %remote_url, "Report stored but notification timed out");
                return Err(err);
            }
        };

        tracing::info!(message_id = %sent.id, "Report notification sent");
        Ok(UploadResult { remote_url })
    }

    // Runs one provider call under the per-call deadline and records its latency
    async fn bounded<T>(
        &self,
        step: Step,
        call: impl Future<Output = T>,
    ) -> Result<T, PipelineError> {
        let started = Instant::now();
        let outcome = tokio::time::timeout(self.call_timeout, call).await;
        PROVIDER_LATENCY
            .with_label_values(&[step.as_str()])
            .observe(started.elapsed().as_secs_f64());

        outcome.map_err(|_| PipelineError::Timeout {
            step,
            after: self.call_timeout,
        })
    }
}

fn record(mode: &str, result: &Result<UploadResult, PipelineError>) {
    let outcome = match result {
        Ok(_) => "success",
        Err(err) => err.outcome(),
    };
    PIPELINE_OUTCOMES.with_label_values(&[mode, outcome]).inc();
}
