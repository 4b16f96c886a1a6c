//! Prometheus metrics for sales-insights-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};

/// Lookup counter by operation and outcome.
pub static LOOKUPS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sales_insights_lookups_total",
        "Total number of customer insight lookups",
        &["operation", "outcome"] // ok, error
    )
    .expect("Failed to register lookups_total")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sales_insights_errors_total",
        "Total number of errors by type",
        &["error_type"]
    )
    .expect("Failed to register errors_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "sales_insights_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Background jobs by queue and outcome.
pub static JOBS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sales_insights_jobs_total",
        "Total number of background jobs by queue and outcome",
        &["queue", "outcome"] // enqueued, rejected, succeeded, failed, timed_out
    )
    .expect("Failed to register jobs_total")
});

/// Background job duration histogram.
pub static JOB_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "sales_insights_job_duration_seconds",
        "Background job duration in seconds",
        &["queue"],
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    )
    .expect("Failed to register job_duration")
});

/// Document events received, by doctype and event.
pub static HOOK_EVENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sales_insights_hook_events_total",
        "Total number of document events dispatched to hooks",
        &["doctype", "event"]
    )
    .expect("Failed to register hook_events_total")
});

/// Custom field writes by field name.
pub static FIELD_WRITES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "sales_insights_field_writes_total",
        "Total number of custom field writes",
        &["field"]
    )
    .expect("Failed to register field_writes_total")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&LOOKUPS_TOTAL);
    Lazy::force(&ERRORS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&JOBS_TOTAL);
    Lazy::force(&JOB_DURATION);
    Lazy::force(&HOOK_EVENTS_TOTAL);
    Lazy::force(&FIELD_WRITES_TOTAL);
    Lazy::force(&service_core::middleware::metrics::HTTP_REQUESTS_TOTAL);
    Lazy::force(&service_core::middleware::metrics::HTTP_REQUEST_DURATION);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
