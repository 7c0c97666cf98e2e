//! Metrics module
//!
//! Provides Prometheus metrics for uploads, quota checks and process memory.

pub mod memory;
pub mod server;

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_histogram, Counter,
    CounterVec, Gauge, Histogram,
};

lazy_static! {
    // Upload metrics
    pub static ref UPLOADS_TOTAL: CounterVec = register_counter_vec!(
        "spool_uploads_total",
        "Total number of upload attempts",
        &["status"]  // "success", "failure" or "simulated"
    ).unwrap();

    pub static ref UPLOAD_BYTES_TOTAL: Counter = register_counter!(
        "spool_upload_bytes_total",
        "Total bytes uploaded"
    ).unwrap();

    pub static ref UPLOAD_DURATION: Histogram = register_histogram!(
        "spool_upload_duration_seconds",
        "Upload duration in seconds",
        vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0]
    ).unwrap();

    // Quota metrics
    pub static ref QUOTA_USAGE_PERCENT: Gauge = register_gauge!(
        "spool_quota_usage_percent",
        "Remote disk usage in percent at the last check"
    ).unwrap();

    pub static ref QUOTA_CHECKS_TOTAL: CounterVec = register_counter_vec!(
        "spool_quota_checks_total",
        "Quota checks by result",
        &["result"]  // "pass" or "exceeded"
    ).unwrap();

    // Process metrics
    pub static ref PROCESS_MEMORY_BYTES: Gauge = register_gauge!(
        "spool_process_memory_bytes",
        "Resident memory of the uploader process"
    ).unwrap();

    // Error metrics
    pub static ref ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "spool_errors_total",
        "Total errors",
        &["type"]
    ).unwrap();
}

/// Record a successful upload
pub fn record_upload_success(bytes: u64, duration_secs: f64) {
    UPLOADS_TOTAL.with_label_values(&["success"]).inc();
    UPLOAD_BYTES_TOTAL.inc_by(bytes as f64);
    UPLOAD_DURATION.observe(duration_secs);
}

/// Record a simulated upload
pub fn record_upload_simulated() {
    UPLOADS_TOTAL.with_label_values(&["simulated"]).inc();
}

/// Record a failed upload
pub fn record_upload_failure() {
    UPLOADS_TOTAL.with_label_values(&["failure"]).inc();
}

/// Record the outcome of a quota check
pub fn record_quota_check(usage_percent: u64, within_limit: bool) {
    QUOTA_USAGE_PERCENT.set(usage_percent as f64);
    let result = if within_limit { "pass" } else { "exceeded" };
    QUOTA_CHECKS_TOTAL.with_label_values(&[result]).inc();
}

/// Record the process resident memory
pub fn record_memory_usage(bytes: u64) {
    PROCESS_MEMORY_BYTES.set(bytes as f64);
}

/// Record an error
pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_upload_success() {
        let before = UPLOAD_BYTES_TOTAL.get();
        record_upload_success(1024, 0.5);
        assert!(UPLOAD_BYTES_TOTAL.get() >= before + 1024.0);
    }

    #[test]
    fn test_record_quota_check() {
        record_quota_check(42, true);
        assert!(QUOTA_CHECKS_TOTAL.with_label_values(&["pass"]).get() >= 1.0);
    }

    #[test]
    fn test_record_failure_and_error() {
        record_upload_failure();
        record_error("upload");
        assert!(UPLOADS_TOTAL.with_label_values(&["failure"]).get() >= 1.0);
        assert!(ERRORS_TOTAL.with_label_values(&["upload"]).get() >= 1.0);
    }
}
