//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Queue (depth per status, item lifecycle)
//! - Orchestrator (search, downloads, retries, catalog worker pool)
//! - Pipeline (conversions, placements, seeding)
//! - External services (indexers, torrent client)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Queue Metrics
// =============================================================================

/// Current total queue depth across all statuses.
pub static QUEUE_DEPTH: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("bookwright_queue_items", "Queue items currently tracked").unwrap()
});

/// Current queue depth per status, refreshed each monitor-loop tick.
pub static QUEUE_DEPTH_BY_STATUS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "bookwright_queue_depth_by_status",
            "Queue items currently in each status",
        ),
        &["status"],
    )
    .unwrap()
});

/// Items enqueued total.
pub static ITEMS_ENQUEUED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("bookwright_items_enqueued_total", "Total queue items enqueued"),
        &["kind"], // "torrent", "catalog"
    )
    .unwrap()
});

/// Items that reached a terminal state, by final status.
pub static ITEMS_TERMINATED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "bookwright_items_terminated_total",
            "Total queue items that reached a terminal state",
        ),
        &["status"],
    )
    .unwrap()
});

// =============================================================================
// Orchestrator - Search Metrics
// =============================================================================

/// Search attempts total by result.
pub static SEARCH_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("bookwright_search_attempts_total", "Total search attempts"),
        &["result"], // "found", "no_candidates", "failed"
    )
    .unwrap()
});

/// Search duration in seconds.
pub static SEARCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("bookwright_search_duration_seconds", "Duration of search calls")
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["result"],
    )
    .unwrap()
});

/// Candidates found per search.
pub static CANDIDATES_FOUND: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "bookwright_candidates_found",
            "Number of candidates found per search",
        )
        .buckets(vec![0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0]),
        &[],
    )
    .unwrap()
});

/// Best candidate confidence scores.
pub static MATCH_CONFIDENCE: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "bookwright_match_confidence",
            "Distribution of best candidate confidence scores",
        )
        .buckets(vec![
            10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 95.0, 100.0,
        ]),
        &[],
    )
    .unwrap()
});

// =============================================================================
// Orchestrator - Download Metrics
// =============================================================================

/// Downloads started total, by kind.
pub static DOWNLOADS_STARTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("bookwright_downloads_started_total", "Total downloads started"),
        &["kind"], // "torrent", "catalog"
    )
    .unwrap()
});

/// Downloads completed total, by kind.
pub static DOWNLOADS_COMPLETED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "bookwright_downloads_completed_total",
            "Total downloads completed successfully",
        ),
        &["kind"],
    )
    .unwrap()
});

/// Downloads failed total, by kind.
pub static DOWNLOADS_FAILED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("bookwright_downloads_failed_total", "Total downloads that failed"),
        &["kind"],
    )
    .unwrap()
});

/// Download duration in seconds.
pub static DOWNLOAD_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("bookwright_download_duration_seconds", "Duration of downloads")
            .buckets(vec![
                30.0, 60.0, 120.0, 300.0, 600.0, 1800.0, 3600.0, 7200.0, 14400.0,
            ]),
        &["kind", "result"], // result: "success", "failed"
    )
    .unwrap()
});

/// Retry attempts total by failure kind (mirrors `queue::FailureKind`).
pub static RETRY_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("bookwright_retry_attempts_total", "Total retry attempts"),
        &["failure_kind"], // "search", "download", "audible_download", "conversion", "import"
    )
    .unwrap()
});

/// Items that exhausted their retry budget and reached a permanent failure status.
pub static RETRY_BUDGET_EXHAUSTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "bookwright_retry_budget_exhausted_total",
            "Total items that exhausted their retry budget",
        ),
        &["failure_kind"],
    )
    .unwrap()
});

// =============================================================================
// Catalog Worker Pool Metrics
// =============================================================================

/// Catalog worker pool slots currently occupied.
pub static CATALOG_POOL_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "bookwright_catalog_pool_active",
        "Catalog worker pool slots currently occupied",
    )
    .unwrap()
});

/// Catalog worker pool dispatches waiting for a free slot.
pub static CATALOG_POOL_QUEUED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "bookwright_catalog_pool_queued",
        "Catalog worker pool dispatches waiting for a free slot",
    )
    .unwrap()
});

/// Catalog worker jobs processed total, by outcome.
pub static CATALOG_WORKER_JOBS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "bookwright_catalog_worker_jobs_total",
            "Total catalog worker jobs processed",
        ),
        &["result"], // "success", "failed", "cancelled"
    )
    .unwrap()
});

// =============================================================================
// Pipeline Metrics
// =============================================================================

/// Conversions total by result.
pub static CONVERSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("bookwright_conversions_total", "Total file conversions"),
        &["result"], // "success", "failed", "skipped"
    )
    .unwrap()
});

/// Conversion duration in seconds.
pub static CONVERSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "bookwright_conversion_duration_seconds",
            "Duration of file conversions",
        )
        .buckets(vec![
            1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0,
        ]),
        &[],
    )
    .unwrap()
});

/// Placements total by result.
pub static PLACEMENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("bookwright_placements_total", "Total file placements"),
        &["result"], // "success", "failed", "rollback"
    )
    .unwrap()
});

/// Files placed total.
pub static FILES_PLACED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "bookwright_files_placed_total",
        "Total files placed to destination",
    )
    .unwrap()
});

/// Items that reached Imported/SeedingComplete and were removed from the queue.
pub static ITEMS_COMPLETED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "bookwright_items_completed_total",
        "Total queue items completed successfully",
    )
    .unwrap()
});

/// Items currently seeding, tracked by the orchestrator.
pub static SEEDING_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "bookwright_seeding_active",
        "Queue items currently in the Seeding status",
    )
    .unwrap()
});

// =============================================================================
// External Service Metrics
// =============================================================================

/// External service request duration.
pub static EXTERNAL_SERVICE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "bookwright_external_service_duration_seconds",
            "Duration of external service calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["service", "operation"],
    )
    .unwrap()
});

/// External service requests total.
pub static EXTERNAL_SERVICE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "bookwright_external_service_requests_total",
            "Total external service requests",
        ),
        &["service", "operation", "status"], // status: "success", "error"
    )
    .unwrap()
});

/// Search results returned from indexers.
pub static SEARCH_RESULTS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "bookwright_indexer_search_results",
            "Number of search results returned per indexer query",
        )
        .buckets(vec![0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0]),
        &[],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Queue
        Box::new(QUEUE_DEPTH.clone()),
        Box::new(QUEUE_DEPTH_BY_STATUS.clone()),
        Box::new(ITEMS_ENQUEUED.clone()),
        Box::new(ITEMS_TERMINATED.clone()),
        // Search
        Box::new(SEARCH_ATTEMPTS.clone()),
        Box::new(SEARCH_DURATION.clone()),
        Box::new(CANDIDATES_FOUND.clone()),
        Box::new(MATCH_CONFIDENCE.clone()),
        // Downloads
        Box::new(DOWNLOADS_STARTED.clone()),
        Box::new(DOWNLOADS_COMPLETED.clone()),
        Box::new(DOWNLOADS_FAILED.clone()),
        Box::new(DOWNLOAD_DURATION.clone()),
        Box::new(RETRY_ATTEMPTS.clone()),
        Box::new(RETRY_BUDGET_EXHAUSTED.clone()),
        // Catalog worker pool
        Box::new(CATALOG_POOL_ACTIVE.clone()),
        Box::new(CATALOG_POOL_QUEUED.clone()),
        Box::new(CATALOG_WORKER_JOBS.clone()),
        // Pipeline
        Box::new(CONVERSIONS_TOTAL.clone()),
        Box::new(CONVERSION_DURATION.clone()),
        Box::new(PLACEMENTS_TOTAL.clone()),
        Box::new(FILES_PLACED.clone()),
        Box::new(ITEMS_COMPLETED.clone()),
        Box::new(SEEDING_ACTIVE.clone()),
        // External services
        Box::new(EXTERNAL_SERVICE_DURATION.clone()),
        Box::new(EXTERNAL_SERVICE_REQUESTS.clone()),
        Box::new(SEARCH_RESULTS.clone()),
    ]
}
