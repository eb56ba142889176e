use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use std::sync::Arc;

use super::submission::read_submission;
use crate::error::{ApiError, ApiResult};
use crate::models::MessageResponse;
use crate::orchestrator::PipelineError;
use crate::state::AppState;

pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let request = read_submission(body).await?.into_file_request();

    match state.orchestrator.upload_file(request).await {
        Ok(result) => Ok(Json(MessageResponse::new(format!(
            "Successfully Uploaded {}",
            result.remote_url
        )))),
        Err(PipelineError::Validation(reason)) => {
            tracing::debug!(reason, "Rejected file upload");
            Err(ApiError::Conflict("Content required"))
        }
        Err(err) => {
            tracing::error!(error = %err, "File upload failed");
            Err(ApiError::Internal("Error occurred while uploading"))
        }
    }
}
