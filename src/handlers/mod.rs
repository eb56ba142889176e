mod health;
mod metrics;
mod report;
mod submission;
mod upload;

pub use health::{health_handler, index_handler};
pub use metrics::metrics_handler;
pub use report::{report_handler, report_upload_handler};
pub use upload::upload_handler;
