use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Gauge, HistogramVec, register_counter, register_counter_vec,
    register_gauge, register_histogram_vec,
};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("intake_requests_total", "Total number of requests").unwrap();
    pub static ref RATE_LIMITED_TOTAL: Counter = register_counter!(
        "intake_rate_limited_total",
        "Requests rejected by the rate limiter"
    )
    .unwrap();
    pub static ref RATE_LIMIT_CLIENTS: Gauge = register_gauge!(
        "intake_rate_limit_clients",
        "Client identities currently tracked by the rate limiter"
    )
    .unwrap();
    pub static ref PIPELINE_OUTCOMES: CounterVec = register_counter_vec!(
        "intake_pipeline_outcomes_total",
        "Upload pipeline results by mode and outcome",
        &["mode", "outcome"]
    )
    .unwrap();
    pub static ref PROVIDER_LATENCY: HistogramVec = register_histogram_vec!(
        "intake_provider_latency_seconds",
        "Latency of storage and messaging calls in seconds",
        &["provider"]
    )
    .unwrap();
}
