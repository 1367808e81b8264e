//! Fallback catalog-download collaborator.
//!
//! The DRM-protected catalog service (Audible or equivalent) is an opaque
//! external collaborator this binary does not implement a client for. Any
//! catalog-kind queue item dispatched against this stub fails fast with a
//! clear error rather than hanging, so a deployment without a real catalog
//! client still boots and serves torrent-only downloads.

use async_trait::async_trait;
use bookwright_core::{
    CancelToken, CatalogDownloadOutcome, CatalogDownloadRequest, CatalogDownloadWorker,
    CatalogOwnership, CatalogWorkerError, ProgressCb,
};

pub struct UnconfiguredCatalogWorker;

#[async_trait]
impl CatalogDownloadWorker for UnconfiguredCatalogWorker {
    async fn download(
        &self,
        _request: CatalogDownloadRequest,
        _progress_cb: ProgressCb,
        _cancel_token: CancelToken,
    ) -> Result<CatalogDownloadOutcome, CatalogWorkerError> {
        Err(CatalogWorkerError::Network(
            "no catalog download client configured for this deployment".to_string(),
        ))
    }
}

pub struct UnconfiguredCatalogOwnership;

#[async_trait]
impl CatalogOwnership for UnconfiguredCatalogOwnership {
    async fn is_owned(&self, _catalog_id: &str) -> bool {
        false
    }
}
