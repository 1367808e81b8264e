//! Testing utilities and mock implementations for E2E tests.
//!
//! This module provides mock implementations of all external service traits,
//! allowing comprehensive E2E testing without real infrastructure.
//!
//! # Example
//!
//! ```rust,ignore
//! use bookwright_core::testing::{MockTorrentClient, MockSearcher, MockCatalogDownloadWorker};
//!
//! let torrent_client = MockTorrentClient::new();
//! let searcher = MockSearcher::new();
//! let catalog_worker = MockCatalogDownloadWorker::new();
//!
//! // Configure mock responses
//! searcher.set_results(vec![/* candidates */]).await;
//! torrent_client.set_progress("hash", 0.5).await;
//!
//! // Use in AppState...
//! ```

mod mock_catalog_worker;
mod mock_converter;
mod mock_placer;
mod mock_searcher;
mod mock_torrent_client;

pub use mock_catalog_worker::{MockCatalogDownloadWorker, MockCatalogOwnership};
pub use mock_converter::MockConverter;
pub use mock_placer::MockPlacer;
pub use mock_searcher::MockSearcher;
pub use mock_torrent_client::MockTorrentClient;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::searcher::{TorrentCandidate, TorrentSource};

    /// Create a test torrent candidate with reasonable defaults.
    pub fn torrent_candidate(title: &str, info_hash: &str) -> TorrentCandidate {
        TorrentCandidate {
            title: title.to_string(),
            info_hash: info_hash.to_string(),
            size_bytes: 1024 * 1024 * 100, // 100 MB
            seeders: 50,
            leechers: 10,
            category: Some("Music".to_string()),
            publish_date: None,
            files: None,
            sources: vec![TorrentSource {
                indexer: "mock-indexer".to_string(),
                magnet_uri: Some(format!("magnet:?xt=urn:btih:{}", info_hash)),
                torrent_url: None,
                seeders: 50,
                leechers: 10,
                details_url: None,
            }],
            from_cache: false,
        }
    }

    /// Create a test torrent candidate for audio content.
    pub fn audio_candidate(artist: &str, album: &str, info_hash: &str) -> TorrentCandidate {
        torrent_candidate(&format!("{} - {} [FLAC]", artist, album), info_hash)
    }

    /// Create a test torrent candidate for video content.
    pub fn video_candidate(title: &str, year: u32, info_hash: &str) -> TorrentCandidate {
        let mut candidate =
            torrent_candidate(&format!("{} ({}) 1080p BluRay", title, year), info_hash);
        candidate.category = Some("Movies".to_string());
        candidate.size_bytes = 1024 * 1024 * 1024 * 4; // 4 GB
        candidate
    }
}
