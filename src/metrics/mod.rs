//! Metrics module
//!
//! Process-local Prometheus counters for upload outcomes and per-stage latency.
//! The CLI can dump them with `--metrics`.

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_histogram_vec, Counter, CounterVec,
    Encoder, HistogramVec, TextEncoder,
};

lazy_static! {
    pub static ref UPLOADS_TOTAL: CounterVec = register_counter_vec!(
        "invoice_uploadr_uploads_total",
        "Total number of upload invocations",
        &["status"]
    ).expect("uploads_total registers once");

    pub static ref UPLOAD_BYTES_TOTAL: Counter = register_counter!(
        "invoice_uploadr_upload_bytes_total",
        "Total bytes uploaded and registered with the backend"
    ).expect("upload_bytes_total registers once");

    pub static ref STAGE_DURATION: HistogramVec = register_histogram_vec!(
        "invoice_uploadr_stage_duration_seconds",
        "Network stage duration in seconds",
        &["stage"],  // "presign", "storage" or "notify"
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    ).expect("stage_duration registers once");

    pub static ref ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "invoice_uploadr_errors_total",
        "Total errors by failing stage",
        &["stage"]
    ).expect("errors_total registers once");
}

/// Record a successful upload
pub fn record_upload_success(bytes: u64) {
    UPLOADS_TOTAL.with_label_values(&["success"]).inc();
    UPLOAD_BYTES_TOTAL.inc_by(bytes as f64);
}

/// Record a failed upload
pub fn record_upload_failure() {
    UPLOADS_TOTAL.with_label_values(&["failure"]).inc();
}

/// Record how long a network stage took
pub fn record_stage_duration(stage: &str, duration_secs: f64) {
    STAGE_DURATION
        .with_label_values(&[stage])
        .observe(duration_secs);
}

/// Record an error
pub fn record_error(stage: &str) {
    ERRORS_TOTAL.with_label_values(&[stage]).inc();
}

/// Render all registered metrics in the Prometheus text format
pub fn gather_text() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
