//! The `DownloadClientAdapter` contract consumed by the orchestrator.
//!
//! Wraps the existing backend-facing [`TorrentClient`] trait (qBittorrent
//! today) behind the narrower, snapshot-oriented contract the orchestrator
//! actually drives: submit, poll a `DownloadSnapshot`, pause/resume/remove,
//! best-effort relocate, and a seeding-complete heuristic.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::types::{AddTorrentRequest, TorrentClient, TorrentClientError, TorrentFilters, TorrentState};

pub type DownloadClientError = TorrentClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotState {
    Queued,
    Downloading,
    Uploading,
    Stalled,
    Error,
    Missing,
}

/// A point-in-time view of an in-flight or seeding download.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadSnapshot {
    pub assigned_id: String,
    pub name: String,
    pub state: SnapshotState,
    pub progress: f64,
    pub download_speed_bps: u64,
    pub eta_seconds: i64,
    pub save_path: Option<String>,
    pub ratio: f64,
    pub seeding_time_seconds: i64,
    pub seed_ratio_limit: Option<f64>,
    pub seed_time_limit_seconds: Option<i64>,
}

fn map_state(state: TorrentState) -> SnapshotState {
    match state {
        TorrentState::Downloading | TorrentState::Checking | TorrentState::Queued => {
            SnapshotState::Downloading
        }
        TorrentState::Seeding => SnapshotState::Uploading,
        TorrentState::Paused => SnapshotState::Stalled,
        TorrentState::Stalled => SnapshotState::Stalled,
        TorrentState::Error => SnapshotState::Error,
        TorrentState::Unknown => SnapshotState::Missing,
    }
}

#[async_trait]
pub trait DownloadClientAdapter: Send + Sync {
    async fn add(
        &self,
        source: AddTorrentRequest,
        category: Option<String>,
    ) -> Result<String, DownloadClientError>;

    async fn status(&self, assigned_id: &str) -> Result<Option<DownloadSnapshot>, DownloadClientError>;

    /// Used for post-hoc hash discovery when a submission doesn't
    /// return an id immediately.
    async fn list(&self) -> Result<Vec<DownloadSnapshot>, DownloadClientError>;

    async fn pause(&self, assigned_id: &str) -> Result<(), DownloadClientError>;
    async fn resume(&self, assigned_id: &str) -> Result<(), DownloadClientError>;
    async fn remove(&self, assigned_id: &str, delete_files: bool) -> Result<(), DownloadClientError>;

    /// Best-effort relocate; a client may refuse (returns Ok(false)).
    async fn set_location(&self, assigned_id: &str, save_path: &str) -> Result<bool, DownloadClientError>;

    /// Capability-specific heuristic on top of the ratio/time goals the
    /// orchestrator already checks itself.
    fn is_seeding_complete(&self, snapshot: &DownloadSnapshot) -> bool {
        matches!(snapshot.state, SnapshotState::Error | SnapshotState::Missing)
    }
}

/// Adapts any [`TorrentClient`] to the `DownloadClientAdapter` contract.
pub struct TorrentClientDownloadAdapter<T: TorrentClient> {
    client: T,
}

impl<T: TorrentClient> TorrentClientDownloadAdapter<T> {
    pub fn new(client: T) -> Self {
        Self { client }
    }

    fn to_snapshot(info: super::types::TorrentInfo) -> DownloadSnapshot {
        DownloadSnapshot {
            assigned_id: info.hash,
            name: info.name,
            state: map_state(info.state),
            progress: info.progress * 100.0,
            download_speed_bps: info.download_speed,
            eta_seconds: info.eta_secs.map(|s| s as i64).unwrap_or(-1),
            save_path: info.save_path,
            ratio: info.ratio,
            seeding_time_seconds: 0,
            seed_ratio_limit: None,
            seed_time_limit_seconds: None,
        }
    }
}

#[async_trait]
impl<T: TorrentClient> DownloadClientAdapter for TorrentClientDownloadAdapter<T> {
    async fn add(
        &self,
        source: AddTorrentRequest,
        category: Option<String>,
    ) -> Result<String, DownloadClientError> {
        let source = match category {
            Some(cat) => source.with_category(cat),
            None => source,
        };
        let result = self.client.add_torrent(source).await?;
        Ok(result.hash)
    }

    async fn status(&self, assigned_id: &str) -> Result<Option<DownloadSnapshot>, DownloadClientError> {
        match self.client.get_torrent(assigned_id).await {
            Ok(info) => Ok(Some(Self::to_snapshot(info))),
            Err(TorrentClientError::TorrentNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn list(&self) -> Result<Vec<DownloadSnapshot>, DownloadClientError> {
        let infos = self.client.list_torrents(&TorrentFilters::default()).await?;
        Ok(infos.into_iter().map(Self::to_snapshot).collect())
    }

    async fn pause(&self, assigned_id: &str) -> Result<(), DownloadClientError> {
        self.client.pause_torrent(assigned_id).await
    }

    async fn resume(&self, assigned_id: &str) -> Result<(), DownloadClientError> {
        self.client.resume_torrent(assigned_id).await
    }

    async fn remove(&self, assigned_id: &str, delete_files: bool) -> Result<(), DownloadClientError> {
        self.client.remove_torrent(assigned_id, delete_files).await
    }

    async fn set_location(&self, assigned_id: &str, save_path: &str) -> Result<bool, DownloadClientError> {
        // The underlying backend trait has no relocate primitive; treat this
        // as a refusal rather than an error, matching "a client may
        // refuse" contract.
        warn!(assigned_id, save_path, "set_location not supported by this backend, refusing");
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_state_maps_to_missing_or_error() {
        assert_eq!(map_state(TorrentState::Error), SnapshotState::Error);
        assert_eq!(map_state(TorrentState::Unknown), SnapshotState::Missing);
    }

    #[test]
    fn default_seeding_complete_heuristic_checks_error_and_missing() {
        struct Dummy;
        #[async_trait]
        impl DownloadClientAdapter for Dummy {
            async fn add(&self, _: AddTorrentRequest, _: Option<String>) -> Result<String, DownloadClientError> {
                unimplemented!()
            }
            async fn status(&self, _: &str) -> Result<Option<DownloadSnapshot>, DownloadClientError> {
                unimplemented!()
            }
            async fn list(&self) -> Result<Vec<DownloadSnapshot>, DownloadClientError> {
                unimplemented!()
            }
            async fn pause(&self, _: &str) -> Result<(), DownloadClientError> {
                unimplemented!()
            }
            async fn resume(&self, _: &str) -> Result<(), DownloadClientError> {
                unimplemented!()
            }
            async fn remove(&self, _: &str, _: bool) -> Result<(), DownloadClientError> {
                unimplemented!()
            }
            async fn set_location(&self, _: &str, _: &str) -> Result<bool, DownloadClientError> {
                unimplemented!()
            }
        }

        let snapshot = DownloadSnapshot {
            assigned_id: "x".to_string(),
            name: "x".to_string(),
            state: SnapshotState::Error,
            progress: 0.0,
            download_speed_bps: 0,
            eta_seconds: -1,
            save_path: None,
            ratio: 0.0,
            seeding_time_seconds: 0,
            seed_ratio_limit: None,
            seed_time_limit_seconds: None,
        };
        assert!(Dummy.is_seeding_complete(&snapshot));
    }
}
