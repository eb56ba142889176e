use axum::extract::Multipart;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::http::StatusCode;
use bytes::Bytes;

use crate::error::ApiError;
use crate::models::UploadRequest;

pub const FILE_FIELD: &str = "fileContent";
pub const NAME_FIELD: &str = "fileName";

/// Raw fields of a multipart upload. Anything unreadable is left empty;
/// whether that is acceptable is the orchestrator's call.
#[derive(Debug, Default)]
pub struct Submission {
    /// The `fileName` form field.
    pub form_name: Option<String>,
    /// Filename the client attached to the `fileContent` part.
    pub part_name: Option<String>,
    pub file_bytes: Bytes,
}

impl Submission {
    pub fn into_report_request(self) -> UploadRequest {
        UploadRequest::new(self.form_name, self.file_bytes)
    }

    pub fn into_file_request(self) -> UploadRequest {
        UploadRequest::new(self.part_name, self.file_bytes)
    }
}

// The body limit is the only read failure that is not a missing field
fn over_limit(status: StatusCode, error: &dyn std::fmt::Display) -> Result<(), ApiError> {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::warn!(error = %error, "Upload exceeds body limit");
        return Err(ApiError::PayloadTooLarge("File too large"));
    }
    Ok(())
}

fn read_failed(err: &MultipartError, what: &str) -> Result<(), ApiError> {
    over_limit(err.status(), err)?;
    tracing::debug!(error = %err, "Failed to read {what}");
    Ok(())
}

/// Collect the upload fields. Only an oversized body is an error; anything
/// else unreadable leaves the field empty.
pub async fn read_submission(
    body: Result<Multipart, MultipartRejection>,
) -> Result<Submission, ApiError> {
    let mut multipart = match body {
        Ok(multipart) => multipart,
        Err(rejection) => {
            over_limit(rejection.status(), &rejection)?;
            tracing::debug!(error = %rejection, "Request has no usable multipart body");
            return Ok(Submission::default());
        }
    };

    let mut submission = Submission::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                read_failed(&err, "multipart body")?;
                break;
            }
        };

        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(FILE_FIELD) => {
                submission.part_name = field.file_name().map(str::to_string);
                match field.bytes().await {
                    Ok(bytes) => submission.file_bytes = bytes,
                    Err(err) => {
                        read_failed(&err, "file content")?;
                        break;
                    }
                }
            }
            Some(NAME_FIELD) => match field.text().await {
                Ok(text) => submission.form_name = Some(text),
                Err(err) => {
                    read_failed(&err, "file name")?;
                    break;
                }
            },
            _ => {}
        }
    }

    Ok(submission)
}
