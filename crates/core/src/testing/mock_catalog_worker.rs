//! Mock catalog download worker and ownership check for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::catalog_worker::{
    CancelToken, CatalogDownloadOutcome, CatalogDownloadRequest, CatalogDownloadWorker,
    CatalogOwnership, CatalogWorkerError, ProgressCb,
};

/// A recorded download request for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedDownload {
    pub request: CatalogDownloadRequest,
}

/// Mock implementation of the `CatalogDownloadWorker` trait.
///
/// Provides controllable behavior for testing:
/// - Return a configured outcome or error per `catalog_id`
/// - Emit configured progress callbacks before resolving
/// - Track dispatched requests for assertions
pub struct MockCatalogDownloadWorker {
    outcomes: Arc<RwLock<HashMap<String, Result<CatalogDownloadOutcome, String>>>>,
    default_outcome: Arc<RwLock<Option<CatalogDownloadOutcome>>>,
    progress_steps: Arc<RwLock<Vec<(u64, Option<u64>, String)>>>,
    requests: Arc<RwLock<Vec<RecordedDownload>>>,
}

impl std::fmt::Debug for MockCatalogDownloadWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockCatalogDownloadWorker")
            .field("outcomes", &"<outcomes>")
            .field("requests", &"<requests>")
            .finish()
    }
}

impl Default for MockCatalogDownloadWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCatalogDownloadWorker {
    pub fn new() -> Self {
        Self {
            outcomes: Arc::new(RwLock::new(HashMap::new())),
            default_outcome: Arc::new(RwLock::new(None)),
            progress_steps: Arc::new(RwLock::new(Vec::new())),
            requests: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Configure the outcome returned for a specific `catalog_id`.
    pub async fn set_outcome(&self, catalog_id: &str, outcome: CatalogDownloadOutcome) {
        self.outcomes
            .write()
            .await
            .insert(catalog_id.to_string(), Ok(outcome));
    }

    /// Configure an error returned for a specific `catalog_id`.
    pub async fn set_error(&self, catalog_id: &str, message: &str) {
        self.outcomes
            .write()
            .await
            .insert(catalog_id.to_string(), Err(message.to_string()));
    }

    /// Configure the outcome returned when no per-`catalog_id` entry matches.
    pub async fn set_default_outcome(&self, outcome: CatalogDownloadOutcome) {
        *self.default_outcome.write().await = Some(outcome);
    }

    /// Configure progress steps emitted before the outcome resolves.
    pub async fn set_progress_steps(&self, steps: Vec<(u64, Option<u64>, String)>) {
        *self.progress_steps.write().await = steps;
    }

    /// All download requests dispatched to this worker so far.
    pub async fn recorded_requests(&self) -> Vec<RecordedDownload> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl CatalogDownloadWorker for MockCatalogDownloadWorker {
    async fn download(
        &self,
        request: CatalogDownloadRequest,
        progress_cb: ProgressCb,
        cancel_token: CancelToken,
    ) -> Result<CatalogDownloadOutcome, CatalogWorkerError> {
        self.requests.write().await.push(RecordedDownload {
            request: request.clone(),
        });

        for (downloaded, total, message) in self.progress_steps.read().await.iter() {
            if cancel_token.is_cancelled() {
                return Err(CatalogWorkerError::Cancelled);
            }
            progress_cb(*downloaded, *total, message);
        }

        if cancel_token.is_cancelled() {
            return Err(CatalogWorkerError::Cancelled);
        }

        if let Some(result) = self.outcomes.read().await.get(&request.catalog_id) {
            return result
                .clone()
                .map_err(CatalogWorkerError::Network);
        }

        if let Some(outcome) = self.default_outcome.read().await.clone() {
            return Ok(outcome);
        }

        Ok(CatalogDownloadOutcome {
            audio_path: format!("{}/{}", request.output_dir, request.filename),
            voucher_path: None,
            format: "encrypted-a".to_string(),
        })
    }
}

/// Mock implementation of the `CatalogOwnership` trait.
///
/// Defaults to reporting every `catalog_id` as owned; call `set_owned` to
/// configure specific `catalog_id`s as not owned.
#[derive(Debug, Default)]
pub struct MockCatalogOwnership {
    denied: Arc<RwLock<Vec<String>>>,
}

impl MockCatalogOwnership {
    pub fn new() -> Self {
        Self {
            denied: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Mark a `catalog_id` as not owned.
    pub async fn set_not_owned(&self, catalog_id: &str) {
        self.denied.write().await.push(catalog_id.to_string());
    }
}

#[async_trait]
impl CatalogOwnership for MockCatalogOwnership {
    async fn is_owned(&self, catalog_id: &str) -> bool {
        !self.denied.read().await.iter().any(|id| id == catalog_id)
    }
}
