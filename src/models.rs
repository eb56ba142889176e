use bytes::Bytes;
use serde::{Deserialize, Serialize};

// Plain `{ "message": ... }` body used by every route
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// Response for a report upload - carries the stored file's URL
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReportUploadResponse {
    pub message: String,
    #[serde(rename = "fileUrl")]
    pub file_url: String,
}

// One file submission, as pulled out of a multipart body
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub file_name: Option<String>,
    pub file_bytes: Bytes,
}

impl UploadRequest {
    pub fn new(file_name: Option<String>, file_bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name,
            file_bytes: file_bytes.into(),
        }
    }

    /// Storage identifier derived from the file name: the trimmed name minus
    /// any directory part and extension. `None` if nothing usable is left.
    pub fn destination_label(&self) -> Option<String> {
        let name = self.file_name.as_deref()?.trim();
        let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
        let stem = match base.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => base,
        };

        (!stem.is_empty()).then(|| stem.to_string())
    }
}

// Successful pipeline output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub remote_url: String,
}
