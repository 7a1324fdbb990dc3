//! Prometheus metrics for the reconciliation engine.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

/// Counter for import rows by outcome.
pub static IMPORT_ROWS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "reconciliation_import_rows_total",
        "Total number of import rows processed",
        &["status"]
    )
    .expect("Failed to register IMPORT_ROWS")
});

/// Counter for analyzer runs by ledger type.
pub static ANALYSIS_RUNS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "reconciliation_analysis_runs_total",
        "Total number of analyzer runs",
        &["ledger_type"]
    )
    .expect("Failed to register ANALYSIS_RUNS")
});

/// Counter for flagged entries by category.
pub static ANALYSIS_FLAGS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "reconciliation_analysis_flags_total",
        "Total number of entries flagged by the analyzer",
        &["category"]
    )
    .expect("Failed to register ANALYSIS_FLAGS")
});

/// Counter for cache tier operations.
pub static CACHE_OPERATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "reconciliation_cache_operations_total",
        "Total number of cache tier operations",
        &["tier", "operation", "status"]
    )
    .expect("Failed to register CACHE_OPERATIONS")
});

/// Counter for migrated cache keys.
pub static MIGRATION_KEYS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "reconciliation_migration_keys_total",
        "Total number of cache keys handled by tier migration",
        &["status"]
    )
    .expect("Failed to register MIGRATION_KEYS")
});

/// Histogram for database query duration.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "reconciliation_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Counter for errors.
pub static ERRORS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "reconciliation_errors_total",
        "Total number of errors",
        &["error_type"]
    )
    .expect("Failed to register ERRORS")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&IMPORT_ROWS);
    Lazy::force(&ANALYSIS_RUNS);
    Lazy::force(&ANALYSIS_FLAGS);
    Lazy::force(&CACHE_OPERATIONS);
    Lazy::force(&MIGRATION_KEYS);
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&ERRORS);
}

/// Get all metrics as Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record an import row outcome.
pub fn record_import_row(status: &str) {
    IMPORT_ROWS.with_label_values(&[status]).inc();
}

/// Record a cache tier operation.
pub fn record_cache_operation(tier: &str, operation: &str, status: &str) {
    CACHE_OPERATIONS
        .with_label_values(&[tier, operation, status])
        .inc();
}

/// Record a migration key outcome.
pub fn record_migration_key(status: &str) {
    MIGRATION_KEYS.with_label_values(&[status]).inc();
}

/// Record an error.
pub fn record_error(error_type: &str) {
    ERRORS.with_label_values(&[error_type]).inc();
}
