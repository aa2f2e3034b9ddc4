use std::net::SocketAddr;
use std::time::Instant;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total operations executed. Labels: operation, status.
pub const OPERATIONS_TOTAL: &str = "icetime_operations_total";

/// Histogram: operation latency in seconds. Labels: operation.
pub const OPERATION_DURATION_SECONDS: &str = "icetime_operation_duration_seconds";

/// Counter: bookings rejected because the slot was already held.
pub const BOOKING_CONFLICTS_TOTAL: &str = "icetime_booking_conflicts_total";

/// Counter: bookings committed.
pub const BOOKINGS_CONFIRMED_TOTAL: &str = "icetime_bookings_confirmed_total";

/// Counter: bookings transitioned to cancelled.
pub const BOOKINGS_CANCELLED_TOTAL: &str = "icetime_bookings_cancelled_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: facilities in the directory (active or not).
pub const FACILITIES_TOTAL: &str = "icetime_facilities_total";

/// Histogram: journal group-commit flush duration in seconds.
pub const JOURNAL_FLUSH_DURATION_SECONDS: &str = "icetime_journal_flush_duration_seconds";

/// Histogram: journal group-commit batch size (events per flush).
pub const JOURNAL_FLUSH_BATCH_SIZE: &str = "icetime_journal_flush_batch_size";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}

/// Map a tool-call function name to a short label for metrics.
pub fn operation_label(name: &str) -> &'static str {
    match name {
        "getFacilities" => "get_facilities",
        "checkAvailability" => "check_availability",
        "bookAppointment" => "book_appointment",
        "cancelAppointment" => "cancel_appointment",
        _ => "unknown",
    }
}

/// Record one completed operation against the RED metrics.
pub fn record_operation(operation: &'static str, ok: bool, started: Instant) {
    let status = if ok { "ok" } else { "error" };
    metrics::counter!(OPERATIONS_TOTAL, "operation" => operation, "status" => status)
        .increment(1);
    metrics::histogram!(OPERATION_DURATION_SECONDS, "operation" => operation)
        .record(started.elapsed().as_secs_f64());
}
