// Metric names. The library only records through the `metrics` facade; the
// host decides whether a recorder is installed.

/// Counter: series expansions performed.
pub const SERIES_GENERATED_TOTAL: &str = "shiftbook_series_generated_total";

/// Counter: shift instances produced by expansions.
pub const INSTANCES_GENERATED_TOTAL: &str = "shiftbook_instances_generated_total";

/// Histogram: instances per expansion.
pub const SERIES_SIZE: &str = "shiftbook_series_size";

/// Counter: store mutations. Labels: op.
pub const MUTATIONS_TOTAL: &str = "shiftbook_mutations_total";

/// Counter: records accepted by import.
pub const IMPORT_ACCEPTED_TOTAL: &str = "shiftbook_import_accepted_total";

/// Counter: records dropped by import validation.
pub const IMPORT_REJECTED_TOTAL: &str = "shiftbook_import_rejected_total";

/// Counter: journal writes that failed and were left for a later snapshot.
pub const PERSIST_FAILURES_TOTAL: &str = "shiftbook_persist_failures_total";

/// Counter: journal compactions.
pub const COMPACTIONS_TOTAL: &str = "shiftbook_compactions_total";

/// Record one expansion of `size` instances.
pub fn record_expansion(size: usize) {
    metrics::counter!(SERIES_GENERATED_TOTAL).increment(1);
    metrics::counter!(INSTANCES_GENERATED_TOTAL).increment(size as u64);
    metrics::histogram!(SERIES_SIZE).record(size as f64);
}
