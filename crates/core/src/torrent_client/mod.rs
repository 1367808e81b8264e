//! Torrent client abstraction.
//!
//! This module provides a `TorrentClient` trait for managing torrents
//! (qBittorrent today), plus the orchestrator-facing adapter layer: a
//! narrower `DownloadClientAdapter` contract, path translation between the
//! orchestrator's and client's filesystem views, and the HTTP bridge used to
//! fetch torrent payloads the client can't reach directly.

mod download_client;
mod path_mapper;
mod qbittorrent;
mod source_fetch;
mod types;

pub use download_client::{
    DownloadClientAdapter, DownloadClientError, DownloadSnapshot, SnapshotState,
    TorrentClientDownloadAdapter,
};
pub use path_mapper::{PathMapper, PathMapping};
pub use qbittorrent::QBittorrentClient;
pub use source_fetch::{DirectProviderSession, FetchedSource, SourceFetchError, SourceFetcher};
pub use types::*;
