//! Pluggable collaborators for catalog (DRM) downloads.

use async_trait::async_trait;

use super::types::{CancelToken, CatalogDownloadOutcome, CatalogDownloadRequest, CatalogWorkerError, ProgressCb};

/// Performs a single DRM-protected catalog download in-process. The core
/// never implements catalog auth or DRM voucher handling itself — only
/// calls this capability, same as `SearchAdapter`/`DownloadClientAdapter`.
#[async_trait]
pub trait CatalogDownloadWorker: Send + Sync {
    async fn download(
        &self,
        request: CatalogDownloadRequest,
        progress_cb: ProgressCb,
        cancel_token: CancelToken,
    ) -> Result<CatalogDownloadOutcome, CatalogWorkerError>;
}

/// Side-effect-free ownership check consulted before a catalog_id is handed
/// to the worker pool. Grounded on the original
/// `services/audible/ownership_validator.py`'s `assess_audible_ownership`:
/// the core only needs the boolean verdict, the reasoning behind it lives in
/// whatever implementation the deployment plugs in.
#[async_trait]
pub trait CatalogOwnership: Send + Sync {
    async fn is_owned(&self, catalog_id: &str) -> bool;
}
