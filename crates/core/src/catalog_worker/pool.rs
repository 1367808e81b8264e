//! Bounded worker pool for catalog (DRM) downloads.
//!
//! A fixed `Arc<Semaphore>` sized to `catalog_concurrency` guards dispatch,
//! work runs as a fire-and-forget `tokio::spawn`, and a `PoolStats` struct of
//! `AtomicU64` counters tracks active/queued/total_processed/total_failed.
//! Results and progress are buffered for the monitor loop to pick up on its
//! next iteration rather than delivered synchronously — queue mutations only
//! ever happen on the monitor loop's own thread.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use super::traits::{CatalogDownloadWorker, CatalogOwnership};
use super::types::{
    CancelToken, CatalogDownloadOutcome, CatalogDownloadRequest, CatalogWorkerError,
};

#[derive(Debug, Default)]
pub struct PoolStats {
    pub active: AtomicU64,
    pub queued: AtomicU64,
    pub total_processed: AtomicU64,
    pub total_failed: AtomicU64,
}

impl PoolStats {
    pub fn to_status(&self) -> PoolStatus {
        PoolStatus {
            active: self.active.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            total_processed: self.total_processed.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub active: u64,
    pub queued: u64,
    pub total_processed: u64,
    pub total_failed: u64,
}

#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub downloaded_bytes: u64,
    pub total_bytes: Option<u64>,
    pub message: String,
}

enum WorkerResult {
    Outcome(CatalogDownloadOutcome),
    Failed(String),
    Cancelled,
}

struct Shared {
    progress: Mutex<HashMap<i64, ProgressSnapshot>>,
    results: Mutex<HashMap<i64, WorkerResult>>,
    tokens: Mutex<HashMap<i64, CancelToken>>,
}

/// Dispatches catalog downloads onto a bounded pool. One instance is shared
/// (cloned cheaply via `Arc` fields) between the orchestrator's monitor loop
/// and the spawned worker tasks.
pub struct CatalogWorkerPool {
    worker: Arc<dyn CatalogDownloadWorker>,
    ownership: Arc<dyn CatalogOwnership>,
    semaphore: Arc<Semaphore>,
    stats: Arc<PoolStats>,
    shared: Arc<Shared>,
}

impl CatalogWorkerPool {
    pub fn new(
        worker: Arc<dyn CatalogDownloadWorker>,
        ownership: Arc<dyn CatalogOwnership>,
        concurrency: usize,
    ) -> Self {
        Self {
            worker,
            ownership,
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            stats: Arc::new(PoolStats::default()),
            shared: Arc::new(Shared {
                progress: Mutex::new(HashMap::new()),
                results: Mutex::new(HashMap::new()),
                tokens: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn status(&self) -> PoolStatus {
        self.stats.to_status()
    }

    /// Checks ownership and, if confirmed, schedules the download on the
    /// pool. A failed ownership check consumes no worker-pool slot, per
    /// Returns the item's `CancelToken` so the caller can cancel it
    /// later via [`Self::cancel`].
    pub async fn dispatch(
        &self,
        item_id: i64,
        request: CatalogDownloadRequest,
    ) -> Result<CancelToken, CatalogWorkerError> {
        if !self.ownership.is_owned(&request.catalog_id).await {
            warn!(item_id, catalog_id = %request.catalog_id, "ownership not confirmed, rejecting before dispatch");
            return Err(CatalogWorkerError::OwnershipNotConfirmed(request.catalog_id));
        }

        let token = CancelToken::new();
        self.shared.tokens.lock().unwrap().insert(item_id, token.clone());
        self.stats.queued.fetch_add(1, Ordering::Relaxed);

        let worker = self.worker.clone();
        let semaphore = self.semaphore.clone();
        let stats = self.stats.clone();
        let shared = self.shared.clone();
        let cancel_token = token.clone();

        tokio::spawn(async move {
            let permit = semaphore.acquire_owned().await;
            stats.queued.fetch_sub(1, Ordering::Relaxed);
            let Ok(_permit) = permit else {
                error!(item_id, "semaphore closed, dropping catalog download");
                return;
            };
            stats.active.fetch_add(1, Ordering::Relaxed);

            let shared_progress = shared.clone();
            let progress_cb: super::types::ProgressCb = Arc::new(move |downloaded, total, message| {
                shared_progress.progress.lock().unwrap().insert(
                    item_id,
                    ProgressSnapshot {
                        downloaded_bytes: downloaded,
                        total_bytes: total,
                        message: message.to_string(),
                    },
                );
            });

            let result = worker.download(request, progress_cb, cancel_token.clone()).await;
            stats.active.fetch_sub(1, Ordering::Relaxed);

            let outcome = match result {
                Ok(outcome) => {
                    stats.total_processed.fetch_add(1, Ordering::Relaxed);
                    WorkerResult::Outcome(outcome)
                }
                Err(CatalogWorkerError::Cancelled) => {
                    debug!(item_id, "catalog download cancelled");
                    WorkerResult::Cancelled
                }
                Err(e) => {
                    stats.total_failed.fetch_add(1, Ordering::Relaxed);
                    WorkerResult::Failed(e.to_string())
                }
            };
            shared.results.lock().unwrap().insert(item_id, outcome);
            shared.tokens.lock().unwrap().remove(&item_id);
        });

        Ok(token)
    }

    /// Fires the item's cancel token, if the worker is still tracked.
    pub fn cancel(&self, item_id: i64) {
        if let Some(token) = self.shared.tokens.lock().unwrap().get(&item_id) {
            token.cancel();
        }
    }

    /// Latest progress snapshot, consumed (removed) by the monitor loop.
    pub fn take_progress(&self, item_id: i64) -> Option<ProgressSnapshot> {
        self.shared.progress.lock().unwrap().remove(&item_id)
    }

    /// Final outcome, if the download has finished since the last poll.
    pub fn take_result(&self, item_id: i64) -> Option<Result<CatalogDownloadOutcome, CatalogWorkerError>> {
        self.shared.results.lock().unwrap().remove(&item_id).map(|r| match r {
            WorkerResult::Outcome(o) => Ok(o),
            WorkerResult::Failed(msg) => Err(CatalogWorkerError::Network(msg)),
            WorkerResult::Cancelled => Err(CatalogWorkerError::Cancelled),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_worker::types::FormatPref;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    struct AlwaysOwned;
    #[async_trait::async_trait]
    impl CatalogOwnership for AlwaysOwned {
        async fn is_owned(&self, _catalog_id: &str) -> bool {
            true
        }
    }

    struct NeverOwned;
    #[async_trait::async_trait]
    impl CatalogOwnership for NeverOwned {
        async fn is_owned(&self, _catalog_id: &str) -> bool {
            false
        }
    }

    struct InstantWorker;
    #[async_trait::async_trait]
    impl CatalogDownloadWorker for InstantWorker {
        async fn download(
            &self,
            request: CatalogDownloadRequest,
            progress_cb: super::super::types::ProgressCb,
            _cancel_token: CancelToken,
        ) -> Result<CatalogDownloadOutcome, CatalogWorkerError> {
            progress_cb(100, Some(100), "done");
            Ok(CatalogDownloadOutcome {
                audio_path: format!("{}/{}", request.output_dir, request.filename),
                voucher_path: None,
                format: "m4b".to_string(),
            })
        }
    }

    struct CancellableWorker {
        started: Arc<AtomicBool>,
    }
    #[async_trait::async_trait]
    impl CatalogDownloadWorker for CancellableWorker {
        async fn download(
            &self,
            _request: CatalogDownloadRequest,
            _progress_cb: super::super::types::ProgressCb,
            cancel_token: CancelToken,
        ) -> Result<CatalogDownloadOutcome, CatalogWorkerError> {
            self.started.store(true, Ordering::SeqCst);
            loop {
                if cancel_token.is_cancelled() {
                    return Err(CatalogWorkerError::Cancelled);
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        }
    }

    fn request() -> CatalogDownloadRequest {
        CatalogDownloadRequest {
            catalog_id: "C1".to_string(),
            output_dir: "/tmp/out".to_string(),
            filename: "book.m4b".to_string(),
            format_pref: FormatPref::EncryptedA,
            quality: "best".to_string(),
            allow_fallback: true,
        }
    }

    #[tokio::test]
    async fn ownership_rejection_consumes_no_slot() {
        let pool = CatalogWorkerPool::new(Arc::new(InstantWorker), Arc::new(NeverOwned), 1);
        let result = pool.dispatch(1, request()).await;
        assert!(matches!(result, Err(CatalogWorkerError::OwnershipNotConfirmed(_))));
        assert_eq!(pool.status().active, 0);
        assert_eq!(pool.status().queued, 0);
    }

    #[tokio::test]
    async fn successful_download_reports_outcome() {
        let pool = CatalogWorkerPool::new(Arc::new(InstantWorker), Arc::new(AlwaysOwned), 1);
        pool.dispatch(1, request()).await.unwrap();

        let mut outcome = None;
        for _ in 0..50 {
            if let Some(r) = pool.take_result(1) {
                outcome = Some(r);
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let outcome = outcome.expect("worker should have completed").unwrap();
        assert_eq!(outcome.format, "m4b");
        assert_eq!(pool.status().total_processed, 1);
    }

    #[tokio::test]
    async fn cancel_token_reaches_worker() {
        let started = Arc::new(AtomicBool::new(false));
        let worker = Arc::new(CancellableWorker { started: started.clone() });
        let pool = CatalogWorkerPool::new(worker, Arc::new(AlwaysOwned), 1);
        pool.dispatch(1, request()).await.unwrap();

        for _ in 0..50 {
            if started.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        pool.cancel(1);

        let mut outcome = None;
        for _ in 0..50 {
            if let Some(r) = pool.take_result(1) {
                outcome = Some(r);
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(matches!(outcome.unwrap(), Err(CatalogWorkerError::Cancelled)));
    }
}
