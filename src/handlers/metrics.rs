use prometheus::{Encoder, TextEncoder};

use crate::error::{ApiError, ApiResult};

pub async fn metrics_handler() -> ApiResult<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder.encode(&metric_families, &mut buffer).map_err(|err| {
        tracing::error!(error = %err, "Failed to encode metrics");
        ApiError::Internal("Failed to encode metrics")
    })?;

    String::from_utf8(buffer).map_err(|err| {
        tracing::error!(error = %err, "Metrics output was not UTF-8");
        ApiError::Internal("Failed to encode metrics")
    })
}
