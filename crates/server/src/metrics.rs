//! Prometheus metrics for observability.
//!
//! - HTTP request metrics (latency, counts, in-flight)
//! - Ticket operation counters (creates, status updates, imports, errors)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "ticketdesk_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .expect("valid histogram definition")
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("ticketdesk_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .expect("valid counter definition")
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "ticketdesk_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .expect("valid gauge definition")
});

// =============================================================================
// Ticket Metrics
// =============================================================================

/// Tickets created total.
pub static TICKETS_CREATED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "ticketdesk_tickets_created_total",
        "Total tickets created since startup",
    )
    .expect("valid counter definition")
});

/// Status updates by outcome.
pub static TICKET_STATUS_UPDATES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "ticketdesk_ticket_status_updates_total",
            "Ticket status update attempts",
        ),
        &["result"],
    )
    .expect("valid counter definition")
});

/// Tickets written by bulk imports.
pub static TICKETS_IMPORTED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "ticketdesk_tickets_imported_total",
        "Tickets written by bulk imports",
    )
    .expect("valid counter definition")
});

/// Batched writes committed by bulk imports.
pub static IMPORT_BATCHES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "ticketdesk_import_batches_total",
        "Batched writes committed by bulk imports",
    )
    .expect("valid counter definition")
});

/// CSV rows rejected during import decoding.
pub static IMPORT_ROWS_REJECTED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "ticketdesk_import_rows_rejected_total",
        "CSV rows rejected during import decoding",
    )
    .expect("valid counter definition")
});

/// Failed ticket operations by error kind.
pub static TICKET_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "ticketdesk_ticket_errors_total",
            "Failed ticket operations by error kind",
        ),
        &["kind"],
    )
    .expect("valid counter definition")
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // HTTP
        Box::new(HTTP_REQUEST_DURATION.clone()),
        Box::new(HTTP_REQUESTS_TOTAL.clone()),
        Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()),
        // Tickets
        Box::new(TICKETS_CREATED_TOTAL.clone()),
        Box::new(TICKET_STATUS_UPDATES.clone()),
        Box::new(TICKETS_IMPORTED_TOTAL.clone()),
        Box::new(IMPORT_BATCHES_TOTAL.clone()),
        Box::new(IMPORT_ROWS_REJECTED_TOTAL.clone()),
        Box::new(TICKET_ERRORS_TOTAL.clone()),
    ];

    for collector in collectors {
        registry
            .register(collector)
            .expect("metric registered once");
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
