// prometheus exporter setup

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

pub const DEPOT_UNITS_SAVED_TOTAL: &str = "depot_units_saved_total";
pub const DEPOT_UNITS_SAVE_FAILED_TOTAL: &str = "depot_units_save_failed_total";
pub const DEPOT_INGESTED_BYTES: &str = "depot_ingested_bytes";
pub const DEPOT_RETRIEVAL_FETCH_ERRORS_TOTAL: &str = "depot_retrieval_fetch_errors_total";

pub fn report_unit_saved() {
    counter!(DEPOT_UNITS_SAVED_TOTAL).increment(1);
}

pub fn report_unit_save_failed() {
    counter!(DEPOT_UNITS_SAVE_FAILED_TOTAL).increment(1);
}

pub fn report_ingested_bytes(size: usize) {
    histogram!(DEPOT_INGESTED_BYTES).record(size as f64);
}

pub fn report_retrieval_fetch_error() {
    counter!(DEPOT_RETRIEVAL_FETCH_ERRORS_TOTAL).increment(1);
}

pub fn report_request_error(err_type: &'static str, stage: &'static str) {
    let tags = [("error", err_type), ("stage", stage)];
    counter!("depot_error_by_stage_and_type", &tags).increment(1);
}

pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    const EXPONENTIAL_SECONDS: &[f64] = &[
        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
    ];
    const PAYLOAD_SIZES: &[f64] = &[
        1024.0,      // 1KB
        10240.0,     // 10KB
        102400.0,    // 100KB
        1048576.0,   // 1MB
        10485760.0,  // 10MB
        52428800.0,  // 50MB
        104857600.0, // 100MB, the default body limit
    ];

    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_requests_duration_seconds".to_string()),
            EXPONENTIAL_SECONDS,
        )?
        .set_buckets_for_metric(
            Matcher::Suffix("_duration_seconds".to_string()),
            EXPONENTIAL_SECONDS,
        )?
        .set_buckets_for_metric(Matcher::Full(DEPOT_INGESTED_BYTES.to_string()), PAYLOAD_SIZES)?
        .set_buckets_for_metric(
            Matcher::Suffix("_body_size_bytes".to_string()),
            PAYLOAD_SIZES,
        )?
        .install_recorder()
}
