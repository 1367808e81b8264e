//! Types for the queue orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog_worker::CatalogWorkerError;
use crate::converter::ConverterError;
use crate::placer::PlacerError;
use crate::queue::{QueueStoreError, Status};
use crate::searcher::SearchAdapterError;
use crate::torrent_client::{DownloadClientError, SourceFetchError};

/// Errors that can occur during orchestration.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Queue item not found.
    #[error("queue item not found: {0}")]
    ItemNotFound(i64),

    /// Invalid queue item state for the requested operation.
    #[error("invalid item state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    /// Queue store error.
    #[error("queue store error: {0}")]
    QueueStore(#[from] QueueStoreError),

    /// Indexer search error.
    #[error("search error: {0}")]
    Search(#[from] SearchAdapterError),

    /// Download client error.
    #[error("download client error: {0}")]
    DownloadClient(#[from] DownloadClientError),

    /// Source-fetch bridge error.
    #[error("source fetch error: {0}")]
    SourceFetch(#[from] SourceFetchError),

    /// Catalog worker pool error.
    #[error("catalog worker error: {0}")]
    CatalogWorker(#[from] CatalogWorkerError),

    /// Audio/video conversion error.
    #[error("conversion error: {0}")]
    Converter(#[from] ConverterError),

    /// File placement error.
    #[error("placement error: {0}")]
    Placer(#[from] PlacerError),

    /// Missing data required to advance a queue item's pipeline stage.
    #[error("missing data on queue item {0}: {1}")]
    MissingData(i64, String),
}

/// Current status of the orchestrator's monitor loop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    /// Whether the monitor loop task is running.
    pub running: bool,
    /// Count of queue items per status, as reported by the queue store.
    pub queue_counts: Vec<(Status, i64)>,
    /// Catalog-worker pool slots currently occupied.
    pub active_catalog_downloads: usize,
    /// Torrent/magnet downloads currently tracked by the download client adapter.
    pub active_torrent_downloads: usize,
}

impl OrchestratorStatus {
    pub fn total_active(&self) -> i64 {
        self.queue_counts
            .iter()
            .filter(|(status, _)| status.is_active())
            .map(|(_, count)| *count)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orchestrator_status_default() {
        let status = OrchestratorStatus::default();
        assert!(!status.running);
        assert_eq!(status.active_catalog_downloads, 0);
        assert_eq!(status.total_active(), 0);
    }

    #[test]
    fn test_orchestrator_status_total_active() {
        let status = OrchestratorStatus {
            running: true,
            queue_counts: vec![
                (Status::Searching, 2),
                (Status::Complete, 5),
                (Status::Downloading, 1),
            ],
            active_catalog_downloads: 0,
            active_torrent_downloads: 1,
        };
        assert_eq!(status.total_active(), 3);
    }

    #[test]
    fn test_error_display() {
        let err = OrchestratorError::ItemNotFound(42);
        assert_eq!(err.to_string(), "queue item not found: 42");

        let err = OrchestratorError::InvalidState {
            expected: "Found".to_string(),
            actual: "Complete".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid item state: expected Found, got Complete"
        );
    }
}
