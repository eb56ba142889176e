use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::storage::{
    ByteStream, ContentKind, StorageClient, StorageError, StorageResult, UploadOptions,
    UploadReceipt,
};

pub const DEFAULT_BASE_URL: &str = "https://api.cloudinary.com";

// Cloudinary error envelope: {"error": {"message": "..."}}
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Signed-upload client for the Cloudinary upload API.
#[derive(Clone)]
pub struct CloudinaryClient {
    http: reqwest::Client,
    base_url: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

impl CloudinaryClient {
    pub fn new(
        http: reqwest::Client,
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, kind: ContentKind) -> String {
        format!(
            "{}/v1_1/{}/{}/upload",
            self.base_url,
            self.cloud_name,
            kind.as_str()
        )
    }

    // Signed parameters, already in the alphabetical order the signature needs
    fn signed_params(&self, options: &UploadOptions, timestamp: i64) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(2);
        if let Some(id) = &options.identifier {
            params.push(("public_id", id.clone()));
        }
        params.push(("timestamp", timestamp.to_string()));
        params
    }

    async fn post(&self, file: Part, options: UploadOptions) -> StorageResult<UploadReceipt> {
        let params = self.signed_params(&options, chrono::Utc::now().timestamp());
        let signature = sign(&params, &self.api_secret);

        let mut form = Form::new()
            .part("file", file)
            .text("api_key", self.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (name, value) in params {
            form = form.text(name, value);
        }

        tracing::debug!(
            kind = options.content_kind.as_str(),
            identifier = ?options.identifier,
            "Uploading to Cloudinary"
        );

        let response = self
            .http
            .post(self.endpoint(options.content_kind))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorEnvelope>().await {
                Ok(envelope) => envelope.error.message,
                Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
            };
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<UploadReceipt>().await?)
    }
}

/// Cloudinary request signature: SHA-256 over `k=v&k=v` (sorted keys) with the
/// API secret appended, lower-hex encoded.
pub fn sign(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let joined = sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn file_part_name(options: &UploadOptions) -> String {
    options
        .identifier
        .clone()
        .unwrap_or_else(|| "upload".to_string())
}

#[async_trait]
impl StorageClient for CloudinaryClient {
    async fn upload(&self, data: Bytes, options: UploadOptions) -> StorageResult<UploadReceipt> {
        let part = Part::bytes(data.to_vec()).file_name(file_part_name(&options));
        self.post(part, options).await
    }

    async fn upload_stream(
        &self,
        chunks: ByteStream,
        options: UploadOptions,
    ) -> StorageResult<UploadReceipt> {
        let part =
            Part::stream(reqwest::Body::wrap_stream(chunks)).file_name(file_part_name(&options));
        self.post(part, options).await
    }
}
