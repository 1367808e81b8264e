//! Types for torrent client operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during torrent client operations.
#[derive(Debug, Error)]
pub enum TorrentClientError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Torrent not found: {0}")]
    TorrentNotFound(String),

    #[error("Invalid torrent data: {0}")]
    InvalidTorrent(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// State of a torrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentState {
    /// Downloading from peers.
    Downloading,
    /// Seeding to peers.
    Seeding,
    /// Download or upload is paused.
    Paused,
    /// Checking file integrity.
    Checking,
    /// Queued for download.
    Queued,
    /// Stalled (no peers).
    Stalled,
    /// Error state.
    Error,
    /// Unknown state.
    Unknown,
}

impl TorrentState {
    /// Returns the string representation for API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            TorrentState::Downloading => "downloading",
            TorrentState::Seeding => "seeding",
            TorrentState::Paused => "paused",
            TorrentState::Checking => "checking",
            TorrentState::Queued => "queued",
            TorrentState::Stalled => "stalled",
            TorrentState::Error => "error",
            TorrentState::Unknown => "unknown",
        }
    }
}

/// Information about a torrent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorrentInfo {
    /// Info hash (lowercase hex).
    pub hash: String,
    /// Torrent name.
    pub name: String,
    /// Current state.
    pub state: TorrentState,
    /// Download progress (0.0 - 1.0).
    pub progress: f64,
    /// Total size in bytes.
    pub size_bytes: u64,
    /// Downloaded bytes.
    pub downloaded_bytes: u64,
    /// Uploaded bytes.
    pub uploaded_bytes: u64,
    /// Current download speed in bytes/second.
    pub download_speed: u64,
    /// Current upload speed in bytes/second.
    pub upload_speed: u64,
    /// Number of seeders.
    pub seeders: u32,
    /// Number of leechers.
    pub leechers: u32,
    /// Ratio (uploaded/downloaded).
    pub ratio: f64,
    /// ETA in seconds (None if unknown or complete).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_secs: Option<u64>,
    /// When the torrent was added.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
    /// When the torrent completed downloading.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Save path on disk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_path: Option<String>,
    /// Category/label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Upload speed limit in bytes/second (0 = unlimited).
    pub upload_limit: u64,
    /// Download speed limit in bytes/second (0 = unlimited).
    pub download_limit: u64,
}

/// Request to add a new torrent.
#[derive(Debug, Clone)]
pub enum AddTorrentRequest {
    /// Add via magnet URI.
    Magnet {
        /// Magnet URI.
        uri: String,
        /// Optional download path override.
        download_path: Option<String>,
        /// Optional category/label.
        category: Option<String>,
        /// Start paused.
        paused: bool,
    },
    /// Add via .torrent file contents.
    TorrentFile {
        /// Raw .torrent file bytes.
        data: Vec<u8>,
        /// Original filename (for logging).
        filename: Option<String>,
        /// Optional download path override.
        download_path: Option<String>,
        /// Optional category/label.
        category: Option<String>,
        /// Start paused.
        paused: bool,
    },
}

impl AddTorrentRequest {
    /// Create a magnet request with default options.
    pub fn magnet(uri: impl Into<String>) -> Self {
        AddTorrentRequest::Magnet {
            uri: uri.into(),
            download_path: None,
            category: None,
            paused: false,
        }
    }

    /// Create a torrent file request with default options.
    pub fn torrent_file(data: Vec<u8>) -> Self {
        AddTorrentRequest::TorrentFile {
            data,
            filename: None,
            download_path: None,
            category: None,
            paused: false,
        }
    }

    /// Set the download path.
    pub fn with_download_path(mut self, path: impl Into<String>) -> Self {
        match &mut self {
            AddTorrentRequest::Magnet { download_path, .. } => {
                *download_path = Some(path.into());
            }
            AddTorrentRequest::TorrentFile { download_path, .. } => {
                *download_path = Some(path.into());
            }
        }
        self
    }

    /// Set the category.
    pub fn with_category(mut self, cat: impl Into<String>) -> Self {
        match &mut self {
            AddTorrentRequest::Magnet { category, .. } => {
                *category = Some(cat.into());
            }
            AddTorrentRequest::TorrentFile { category, .. } => {
                *category = Some(cat.into());
            }
        }
        self
    }

    /// Set whether to start paused.
    pub fn with_paused(mut self, p: bool) -> Self {
        match &mut self {
            AddTorrentRequest::Magnet { paused, .. } => {
                *paused = p;
            }
            AddTorrentRequest::TorrentFile { paused, .. } => {
                *paused = p;
            }
        }
        self
    }
}

/// Filters for listing torrents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TorrentFilters {
    /// Filter by state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<TorrentState>,
    /// Filter by category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Search by name (partial match).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl TorrentFilters {
    /// Check if any filters are set.
    pub fn is_empty(&self) -> bool {
        self.state.is_none() && self.category.is_none() && self.search.is_none()
    }
}

/// Result of adding a torrent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTorrentResult {
    /// Info hash of the added torrent.
    pub hash: String,
    /// Name of the torrent (may be unknown for magnets initially).
    pub name: Option<String>,
}

/// Trait for torrent client backends.
#[async_trait]
pub trait TorrentClient: Send + Sync {
    /// Backend name for logging/audit.
    fn name(&self) -> &str;

    /// Add a new torrent.
    async fn add_torrent(
        &self,
        request: AddTorrentRequest,
    ) -> Result<AddTorrentResult, TorrentClientError>;

    /// List all torrents, optionally filtered.
    async fn list_torrents(
        &self,
        filters: &TorrentFilters,
    ) -> Result<Vec<TorrentInfo>, TorrentClientError>;

    /// Get a specific torrent by hash.
    async fn get_torrent(&self, hash: &str) -> Result<TorrentInfo, TorrentClientError>;

    /// Remove a torrent.
    /// If `delete_files` is true, also delete downloaded files.
    async fn remove_torrent(
        &self,
        hash: &str,
        delete_files: bool,
    ) -> Result<(), TorrentClientError>;

    /// Pause a torrent.
    async fn pause_torrent(&self, hash: &str) -> Result<(), TorrentClientError>;

    /// Resume a paused torrent.
    async fn resume_torrent(&self, hash: &str) -> Result<(), TorrentClientError>;

    /// Set upload speed limit for a torrent (bytes/second, 0 = unlimited).
    async fn set_upload_limit(&self, hash: &str, limit: u64) -> Result<(), TorrentClientError>;

    /// Set download speed limit for a torrent (bytes/second, 0 = unlimited).
    async fn set_download_limit(&self, hash: &str, limit: u64) -> Result<(), TorrentClientError>;

    /// Recheck/verify torrent files.
    async fn recheck_torrent(&self, hash: &str) -> Result<(), TorrentClientError>;
}
