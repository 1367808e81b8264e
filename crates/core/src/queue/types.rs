//! Core queue data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The kind of item in the queue; selects which worker path is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Torrent,
    Magnet,
    Catalog,
}

/// Lifecycle status of a queue item. See the transition table in
/// [`crate::state_machine`] for the allowed moves between these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Queued,
    Searching,
    Found,
    Downloading,
    AudibleDownloading,
    Paused,
    Complete,
    Converting,
    Converted,
    Importing,
    Imported,
    Seeding,
    SeedingComplete,
    SearchFailed,
    DownloadFailed,
    AudibleDownloadFailed,
    ConversionFailed,
    ImportFailed,
    Cancelled,
}

impl Status {
    /// Terminal states by invariant I5: no transition exits these except an
    /// administrative delete.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Status::Imported
                | Status::SeedingComplete
                | Status::Cancelled
                | Status::SearchFailed
                | Status::DownloadFailed
                | Status::AudibleDownloadFailed
                | Status::ConversionFailed
                | Status::ImportFailed
        )
    }

    /// States counted as "active" for the I1 per-catalog-id uniqueness check.
    pub fn is_active(self) -> bool {
        !matches!(
            self,
            Status::Imported | Status::Cancelled | Status::SeedingComplete
        ) && !self.is_terminal_failure()
    }

    fn is_terminal_failure(self) -> bool {
        matches!(
            self,
            Status::SearchFailed
                | Status::DownloadFailed
                | Status::AudibleDownloadFailed
                | Status::ConversionFailed
                | Status::ImportFailed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Queued => "queued",
            Status::Searching => "searching",
            Status::Found => "found",
            Status::Downloading => "downloading",
            Status::AudibleDownloading => "audible_downloading",
            Status::Paused => "paused",
            Status::Complete => "complete",
            Status::Converting => "converting",
            Status::Converted => "converted",
            Status::Importing => "importing",
            Status::Imported => "imported",
            Status::Seeding => "seeding",
            Status::SeedingComplete => "seeding_complete",
            Status::SearchFailed => "search_failed",
            Status::DownloadFailed => "download_failed",
            Status::AudibleDownloadFailed => "audible_download_failed",
            Status::ConversionFailed => "conversion_failed",
            Status::ImportFailed => "import_failed",
            Status::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "queued" => Status::Queued,
            "searching" => Status::Searching,
            "found" => Status::Found,
            "downloading" => Status::Downloading,
            "audible_downloading" => Status::AudibleDownloading,
            "paused" => Status::Paused,
            "complete" => Status::Complete,
            "converting" => Status::Converting,
            "converted" => Status::Converted,
            "importing" => Status::Importing,
            "imported" => Status::Imported,
            "seeding" => Status::Seeding,
            "seeding_complete" => Status::SeedingComplete,
            "search_failed" => Status::SearchFailed,
            "download_failed" => Status::DownloadFailed,
            "audible_download_failed" => Status::AudibleDownloadFailed,
            "conversion_failed" => Status::ConversionFailed,
            "import_failed" => Status::ImportFailed,
            "cancelled" => Status::Cancelled,
            _ => return None,
        })
    }
}

/// The classification of a failure, used to select a [`crate::RetryPolicy`]
/// budget and a retry-target state. One-to-one with the `*_FAILED` statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Search,
    Download,
    AudibleDownload,
    Conversion,
    Import,
}

impl FailureKind {
    pub fn failed_status(self) -> Status {
        match self {
            FailureKind::Search => Status::SearchFailed,
            FailureKind::Download => Status::DownloadFailed,
            FailureKind::AudibleDownload => Status::AudibleDownloadFailed,
            FailureKind::Conversion => Status::ConversionFailed,
            FailureKind::Import => Status::ImportFailed,
        }
    }
}

/// A reference to a user- or auto-selected search candidate, recorded on the
/// item so the FOUND stage does not need to re-run search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreSelectedSource {
    pub source_url: String,
    pub source_info_hash: Option<String>,
}

/// The central persistent entity. Deliberately a closed, flat schema (every
/// field a top-level column) rather than a state-carrying enum or a bag of
/// loosely-typed attributes — see the redesign notes on `QueueItem`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: i64,
    pub catalog_id: String,
    pub status: Status,
    pub priority: i32,
    pub kind: ItemKind,
    pub title: String,
    pub author: String,
    pub pre_selected_source: Option<PreSelectedSource>,
    pub source_url: Option<String>,
    pub source_info_hash: Option<String>,
    pub client_name: Option<String>,
    pub client_id: Option<String>,
    pub temp_path: Option<String>,
    pub voucher_path: Option<String>,
    pub converted_path: Option<String>,
    pub final_path: Option<String>,
    pub format: Option<String>,
    pub progress: Option<f64>,
    pub eta_seconds: Option<i64>,
    pub retry_count: i32,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub queued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub seeding_ratio: Option<f64>,
    pub seeding_time_seconds: Option<i64>,
}

impl QueueItem {
    /// Priority 1-10, higher is earlier; clamps out-of-range inputs rather
    /// than rejecting them, matching the lenient defaulting the rest of this
    /// crate uses for configuration.
    pub fn clamp_priority(priority: i32) -> i32 {
        priority.clamp(1, 10)
    }
}

/// Request to enqueue a new item. Mirrors [`QueueItem`]'s input fields only;
/// everything else is assigned by the store.
#[derive(Debug, Clone)]
pub struct EnqueueRequest {
    pub catalog_id: String,
    pub priority: i32,
    pub kind: ItemKind,
    pub title: String,
    pub author: String,
    pub pre_selected_source: Option<PreSelectedSource>,
}

/// Partial update applied to a queue item. `None` fields are left untouched;
/// to clear an optional field use `Some(None)` — callers build this with the
/// provided setters rather than constructing it by hand in most call sites.
#[derive(Debug, Clone, Default)]
pub struct QueueItemUpdate {
    pub status: Option<Status>,
    pub source_url: Option<Option<String>>,
    pub source_info_hash: Option<Option<String>>,
    pub client_name: Option<Option<String>>,
    pub client_id: Option<Option<String>>,
    pub temp_path: Option<Option<String>>,
    pub voucher_path: Option<Option<String>>,
    pub converted_path: Option<Option<String>>,
    pub final_path: Option<Option<String>>,
    pub format: Option<Option<String>>,
    pub progress: Option<Option<f64>>,
    pub eta_seconds: Option<Option<i64>>,
    pub retry_count: Option<i32>,
    pub next_retry_at: Option<Option<DateTime<Utc>>>,
    pub last_error: Option<Option<String>>,
    pub started_at: Option<Option<DateTime<Utc>>>,
    pub completed_at: Option<Option<DateTime<Utc>>>,
    pub seeding_ratio: Option<Option<f64>>,
    pub seeding_time_seconds: Option<Option<i64>>,
}

impl QueueItemUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = Some(Some(progress));
        self
    }

    pub fn with_last_error(mut self, error: impl Into<String>) -> Self {
        self.last_error = Some(Some(error.into()));
        self
    }
}

/// Filter for querying queue items.
#[derive(Debug, Clone, Default)]
pub struct QueueFilter {
    pub statuses: Option<HashSet<Status>>,
    pub kind: Option<ItemKind>,
    pub limit: Option<i64>,
    pub offset: i64,
}

impl QueueFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.statuses.get_or_insert_with(HashSet::new).insert(status);
        self
    }

    pub fn with_kind(mut self, kind: ItemKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_match_glossary() {
        for s in [
            Status::Imported,
            Status::SeedingComplete,
            Status::Cancelled,
            Status::SearchFailed,
            Status::DownloadFailed,
            Status::AudibleDownloadFailed,
            Status::ConversionFailed,
            Status::ImportFailed,
        ] {
            assert!(s.is_terminal(), "{:?} should be terminal", s);
        }
        for s in [Status::Queued, Status::Searching, Status::Downloading, Status::Seeding] {
            assert!(!s.is_terminal(), "{:?} should not be terminal", s);
        }
    }

    #[test]
    fn status_round_trips_through_str() {
        let all = [
            Status::Queued,
            Status::Searching,
            Status::Found,
            Status::Downloading,
            Status::AudibleDownloading,
            Status::Paused,
            Status::Complete,
            Status::Converting,
            Status::Converted,
            Status::Importing,
            Status::Imported,
            Status::Seeding,
            Status::SeedingComplete,
            Status::SearchFailed,
            Status::DownloadFailed,
            Status::AudibleDownloadFailed,
            Status::ConversionFailed,
            Status::ImportFailed,
            Status::Cancelled,
        ];
        for s in all {
            assert_eq!(Status::parse(s.as_str()), Some(s));
        }
    }

    #[test]
    fn i1_active_excludes_imported_and_failed_and_cancelled() {
        assert!(!Status::Imported.is_active());
        assert!(!Status::Cancelled.is_active());
        assert!(!Status::SeedingComplete.is_active());
        assert!(!Status::SearchFailed.is_active());
        assert!(Status::Queued.is_active());
        assert!(Status::Downloading.is_active());
    }
}
