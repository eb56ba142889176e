use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use std::sync::Arc;

use super::submission::read_submission;
use crate::error::{ApiError, ApiResult};
use crate::models::{MessageResponse, ReportUploadResponse};
use crate::orchestrator::PipelineError;
use crate::state::AppState;

pub async fn report_handler() -> Json<MessageResponse> {
    Json(MessageResponse::new("Success"))
}

pub async fn report_upload_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<ReportUploadResponse>> {
    let request = read_submission(body).await?.into_report_request();

    match state.orchestrator.upload_report(request).await {
        Ok(result) => Ok(Json(ReportUploadResponse {
            message: "File uploaded and message sent successfully".to_string(),
            file_url: result.remote_url,
        })),
        Err(PipelineError::Validation(reason)) => {
            tracing::debug!(reason, "Rejected report upload");
            Err(ApiError::BadRequest("File name and content are required"))
        }
        Err(err) => {
            tracing::error!(error = %err, "Report upload failed");
            Err(ApiError::Internal("Failed to process request"))
        }
    }
}
