//! Ambient HTTP-observability metrics for this binary's own surface.
//!
//! `bookwright-core::metrics` owns the orchestrator/pipeline/queue metrics;
//! this module only adds request-level metrics for the handful of routes
//! this binary serves (`/healthz`, `/metrics`) and exposes the combined
//! registry encoder.

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

pub static HTTP_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "bookwright_http_requests_total",
            "HTTP requests served by this process, by path and status",
        ),
        &["path", "status"],
    )
    .expect("metric creation")
});

pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "bookwright_http_request_duration_seconds",
            "HTTP request latency by path",
        ),
        &["path"],
    )
    .expect("metric creation")
});

/// Registers this module's own metrics plus every core metric into the
/// shared registry. Call once at startup before serving `/metrics`.
pub fn register_metrics() {
    REGISTRY
        .register(Box::new(HTTP_REQUESTS.clone()))
        .expect("register http_requests");
    REGISTRY
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .expect("register http_request_duration");

    for collector in bookwright_core::metrics::all_metrics() {
        REGISTRY
            .register(collector)
            .expect("register core metric collector");
    }
}

/// Renders the registry in the Prometheus text exposition format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Pulls live gauges from the orchestrator's status snapshot into the
/// registry ahead of a scrape (queue depth and catalog-pool occupancy are
/// point-in-time, not event-driven, so they need a pull rather than a push).
pub fn collect_dynamic_metrics<C, P>(orchestrator: &bookwright_core::Orchestrator<C, P>)
where
    C: bookwright_core::Converter + 'static,
    P: bookwright_core::Placer + 'static,
{
    let status = orchestrator.status();
    bookwright_core::metrics::QUEUE_DEPTH.set(status.total_active());
    bookwright_core::metrics::CATALOG_POOL_ACTIVE.set(status.active_catalog_downloads as i64);
}
