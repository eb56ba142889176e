use std::sync::Arc;

use crate::orchestrator::UploadOrchestrator;
use crate::rate_limit::RateLimiter;

// app's shared state
pub struct AppState {
    pub rate_limiter: Arc<RateLimiter>, // shared with the sweeper task
    pub orchestrator: UploadOrchestrator,
}

impl AppState {
    pub fn new(rate_limiter: Arc<RateLimiter>, orchestrator: UploadOrchestrator) -> Self {
        Self {
            rate_limiter,
            orchestrator,
        }
    }
}
