use axum::http::StatusCode;
use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec, TextEncoder};

// Prometheus metrics (default registry)
pub static PROVISIONING_ATTEMPTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "office_provisioning_attempts_total",
        "Provisioning attempts by record kind and outcome",
        &["kind", "outcome"]
    )
    .expect("register provisioning_attempts_total")
});

pub static COMPENSATIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "office_compensations_total",
        "Identities deleted after a failed record write"
    )
    .expect("register compensations_total")
});

pub static COMPENSATION_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "compensation_failures_total",
        "Identities left orphaned because the compensating delete failed"
    )
    .expect("register compensation_failures_total")
});

pub static UPSTREAM_ERRORS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "office_upstream_errors_total",
        "Backend calls answered with an error"
    )
    .expect("register upstream_errors_total")
});

pub static REFRESH_RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "office_refresh_runs_total",
        "Background dashboard refresh runs by outcome",
        &["outcome"]
    )
    .expect("register refresh_runs_total")
});

pub fn encode_metrics() -> (StatusCode, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (StatusCode::INTERNAL_SERVER_ERROR, format!("metrics encode error: {e}"));
    }
    (StatusCode::OK, String::from_utf8(buffer).unwrap_or_default())
}
