//! Queue orchestrator implementation: the monitor loop.
//!
//! Drives queue items through the state machine automatically:
//! - `process_queue`: advance QUEUED and FOUND items (sequential, one pass per tick)
//! - `monitor_downloads`: poll DOWNLOADING/AUDIBLE_DOWNLOADING items for progress
//! - `process_pipeline`: advance COMPLETE/CONVERTED/IMPORTING/SEEDING items
//!
//! Everything above runs on a single `tokio::spawn`ed task, selected against a
//! `broadcast` shutdown signal, so `stop()` is cooperative and immediate
//! rather than polled. The catalog worker pool runs in parallel on its own
//! semaphore-bounded tasks; the monitor loop only ever reads its buffered
//! progress/results, never drives it directly.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::audit::{AuditEvent, AuditHandle};
use crate::catalog_worker::{CatalogDownloadRequest, CatalogWorkerPool, FormatPref};
use crate::converter::{ConversionConstraints, ConversionJob, Converter};
use crate::events::{Event, EventSink};
use crate::placer::{ChecksumType, FilePlacement, PlacementJob, Placer};
use crate::queue::{
    FailureKind, ItemKind, QueueFilter, QueueItem, QueueItemUpdate, QueueStore, RetryOutcome,
    RetryPolicy, Status,
};
use crate::searcher::SearchAdapter;
use crate::torrent_client::{
    AddTorrentRequest, DownloadClientAdapter, FetchedSource, PathMapper, SourceFetcher,
};

use super::config::OrchestratorConfig;
use super::types::{OrchestratorError, OrchestratorStatus};

const ARTIFACT_EXTENSIONS: &[&str] =
    &["m4b", "m4a", "mp3", "aax", "aaxc", "flac", "ogg", "wav"];
const ENCRYPTED_FORMATS: &[&str] = &["encrypted-a", "encrypted-b", "aax", "aaxc"];

/// The queue orchestrator: drives queue items through search, download,
/// conversion, import, and (optionally) seeding, via a single monitor-loop
/// task.
pub struct Orchestrator<C, P>
where
    C: Converter + 'static,
    P: Placer + 'static,
{
    config: OrchestratorConfig,
    queue: Arc<dyn QueueStore>,
    search_adapter: Arc<dyn SearchAdapter>,
    download_client: Arc<dyn DownloadClientAdapter>,
    catalog_pool: Arc<CatalogWorkerPool>,
    converter: Arc<C>,
    placer: Arc<P>,
    path_mapper: Arc<PathMapper>,
    source_fetcher: Arc<SourceFetcher>,
    retry_policy: Arc<RetryPolicy>,
    events: EventSink,
    audit: Option<AuditHandle>,

    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl<C, P> Orchestrator<C, P>
where
    C: Converter + 'static,
    P: Placer + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: OrchestratorConfig,
        queue: Arc<dyn QueueStore>,
        search_adapter: Arc<dyn SearchAdapter>,
        download_client: Arc<dyn DownloadClientAdapter>,
        catalog_pool: Arc<CatalogWorkerPool>,
        converter: Arc<C>,
        placer: Arc<P>,
        events: EventSink,
        audit: Option<AuditHandle>,
    ) -> Self {
        let path_mapper = Arc::new(PathMapper::new(config.torrent_client_path_mappings.clone()));
        let source_fetcher = Arc::new(SourceFetcher::new(
            config.external_base_url_override.clone(),
            config.direct_provider_sessions.clone(),
        ));
        let retry_policy = Arc::new(RetryPolicy::new(config.retry_budgets.clone()));
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            queue,
            search_adapter,
            download_client,
            catalog_pool,
            converter,
            placer,
            path_mapper,
            source_fetcher,
            retry_policy,
            events,
            audit,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Starts the monitor-loop task. A no-op if already running.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("orchestrator already running");
            return;
        }

        info!("starting queue orchestrator");
        if let Some(audit) = &self.audit {
            audit.emit_blocking(AuditEvent::ServiceStarted {
                version: env!("CARGO_PKG_VERSION").to_string(),
                config_hash: format!("{:?}", self.config.polling_interval_seconds),
            });
        }

        let this = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let polling_interval = Duration::from_secs(this.config.polling_interval_seconds.max(1));
            info!("monitor loop started");

            loop {
                if let Err(e) = this.tick().await {
                    error!("monitor loop iteration failed: {}", e);
                }

                let delay = if this.running.load(Ordering::Relaxed) {
                    polling_interval
                } else {
                    Duration::from_millis(0)
                };

                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("monitor loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }

                if !this.running.load(Ordering::Relaxed) {
                    break;
                }
            }
            info!("monitor loop stopped");
        });
    }

    /// Signals the monitor loop to stop after its current iteration.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("orchestrator not running");
            return;
        }
        info!("stopping queue orchestrator");
        let _ = self.shutdown_tx.send(());
        if let Some(audit) = &self.audit {
            audit
                .emit(AuditEvent::ServiceStopped {
                    reason: "stop requested".to_string(),
                })
                .await;
        }
    }

    pub fn status(&self) -> OrchestratorStatus {
        let queue_counts = self.queue.statistics().unwrap_or_default();
        let active_torrent_downloads = queue_counts
            .iter()
            .find(|(s, _)| *s == Status::Downloading)
            .map(|(_, c)| *c as usize)
            .unwrap_or(0);

        OrchestratorStatus {
            running: self.running.load(Ordering::Relaxed),
            queue_counts,
            active_catalog_downloads: self.catalog_pool.status().active as usize,
            active_torrent_downloads,
        }
    }

    /// Runs one full iteration of the monitor loop body.
    async fn tick(&self) -> Result<(), OrchestratorError> {
        self.process_queue().await?;
        self.monitor_downloads().await?;
        self.process_pipeline().await?;
        Ok(())
    }

    // ---- process_queue ---------------------------------------------------

    async fn process_queue(&self) -> Result<(), OrchestratorError> {
        let mut queued = self
            .queue
            .list(QueueFilter::new().with_status(Status::Queued))?;
        queued.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.queued_at.cmp(&b.queued_at)));

        let mut active_searches = self.count_status(Status::Searching)?;

        for item in queued {
            if Self::is_deferred(&item) {
                continue;
            }

            if item.kind == ItemKind::Catalog {
                self.dispatch_catalog(&item).await?;
                continue;
            }

            if item.pre_selected_source.is_some() {
                self.transition_to_found_from_preselected(&item)?;
                continue;
            }

            if active_searches >= self.config.max_active_searches {
                continue;
            }
            active_searches += 1;
            self.run_search(&item).await?;
        }

        let mut found = self
            .queue
            .list(QueueFilter::new().with_status(Status::Found))?;
        found.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.queued_at.cmp(&b.queued_at)));

        let mut active_downloads = self.count_active_downloads()?;

        for item in found {
            if Self::is_deferred(&item) {
                continue;
            }
            if active_downloads >= self.config.max_concurrent_downloads {
                continue;
            }
            if self.dispatch_download(&item).await? {
                active_downloads += 1;
            }
        }

        Ok(())
    }

    fn is_deferred(item: &QueueItem) -> bool {
        item.next_retry_at.map(|t| t > Utc::now()).unwrap_or(false)
    }

    fn count_status(&self, status: Status) -> Result<usize, OrchestratorError> {
        Ok(self
            .queue
            .statistics()?
            .into_iter()
            .find(|(s, _)| *s == status)
            .map(|(_, c)| c as usize)
            .unwrap_or(0))
    }

    fn count_active_downloads(&self) -> Result<usize, OrchestratorError> {
        let stats = self.queue.statistics()?;
        let downloading = stats.iter().find(|(s, _)| *s == Status::Downloading).map(|(_, c)| *c).unwrap_or(0);
        let audible = stats
            .iter()
            .find(|(s, _)| *s == Status::AudibleDownloading)
            .map(|(_, c)| *c)
            .unwrap_or(0);
        Ok((downloading + audible) as usize)
    }

    async fn dispatch_catalog(&self, item: &QueueItem) -> Result<(), OrchestratorError> {
        let output_dir = self.temp_dir_for(item.id);
        let request = CatalogDownloadRequest {
            catalog_id: item.catalog_id.clone(),
            output_dir: output_dir.display().to_string(),
            filename: format!("{}.m4b", item.id),
            format_pref: FormatPref::EncryptedAWithFallbackToB,
            quality: "best".to_string(),
            allow_fallback: true,
        };

        match self.catalog_pool.dispatch(item.id, request).await {
            Ok(_token) => {
                self.queue.update(
                    item.id,
                    QueueItemUpdate::new()
                        .with_status(Status::AudibleDownloading),
                )?;
                self.emit_state_changed(item.id, Status::Queued, Status::AudibleDownloading).await;
                Ok(())
            }
            Err(e) => {
                self.fail(item, FailureKind::AudibleDownload, e.to_string()).await
            }
        }
    }

    fn transition_to_found_from_preselected(&self, item: &QueueItem) -> Result<(), OrchestratorError> {
        let selected = item.pre_selected_source.as_ref().expect("checked by caller");
        let update = QueueItemUpdate::new()
            .with_status(Status::Found);
        let mut update = update;
        update.source_url = Some(Some(selected.source_url.clone()));
        update.source_info_hash = Some(selected.source_info_hash.clone());
        self.queue.update(item.id, update)?;
        Ok(())
    }

    async fn run_search(&self, item: &QueueItem) -> Result<(), OrchestratorError> {
        self.queue.update(item.id, QueueItemUpdate::new().with_status(Status::Searching))?;
        self.emit_state_changed(item.id, Status::Queued, Status::Searching).await;

        let candidates = self.search_adapter.search(&item.title, &item.author, &item.catalog_id).await;

        let best = match candidates {
            Ok(candidates) => candidates
                .into_iter()
                .find(|c| c.confidence_score >= self.config.min_search_confidence),
            Err(e) => {
                return self.fail(item, FailureKind::Search, e.to_string()).await;
            }
        };

        match best {
            Some(candidate) => {
                let mut update = QueueItemUpdate::new().with_status(Status::Found);
                update.source_url = Some(Some(candidate.source_url));
                update.source_info_hash = Some(candidate.source_info_hash);
                self.queue.update(item.id, update)?;
                self.emit_state_changed(item.id, Status::Searching, Status::Found).await;
                Ok(())
            }
            None => {
                self.fail(item, FailureKind::Search, "no candidate above min_search_confidence".to_string()).await
            }
        }
    }

    /// Returns whether a download was actually dispatched (consumed a slot).
    async fn dispatch_download(&self, item: &QueueItem) -> Result<bool, OrchestratorError> {
        let Some(source_url) = item.source_url.clone() else {
            self.fail(item, FailureKind::Search, "missing source_url at FOUND stage".to_string()).await?;
            return Ok(false);
        };

        let fetched = match self.source_fetcher.fetch(&source_url).await {
            Ok(f) => f,
            Err(e) => {
                self.fail(item, FailureKind::Download, e.to_string()).await?;
                return Ok(false);
            }
        };

        let local_dir = self.temp_dir_for(item.id);
        let remote_dir = self.path_mapper.to_remote(&local_dir.display().to_string());

        let request = match fetched {
            FetchedSource::Magnet(uri) => AddTorrentRequest::magnet(uri).with_download_path(remote_dir),
            FetchedSource::TorrentBytes(bytes) => {
                AddTorrentRequest::torrent_file(bytes).with_download_path(remote_dir)
            }
        };

        match self.download_client.add(request, None).await {
            Ok(client_id) => {
                let mut update = QueueItemUpdate::new().with_status(Status::Downloading);
                update.client_id = Some(Some(client_id));
                update.started_at = Some(Some(Utc::now()));
                self.queue.update(item.id, update)?;
                self.emit_state_changed(item.id, Status::Found, Status::Downloading).await;
                self.events.emit(Event::DownloadStarted { id: item.id }).await;
                Ok(true)
            }
            Err(e) => {
                self.fail(item, FailureKind::Download, e.to_string()).await?;
                Ok(false)
            }
        }
    }

    // ---- monitor_downloads ------------------------------------------------

    async fn monitor_downloads(&self) -> Result<(), OrchestratorError> {
        let downloading = self
            .queue
            .list(QueueFilter::new().with_status(Status::Downloading))?;

        for item in downloading {
            self.poll_torrent_download(&item).await?;
        }

        let audible = self
            .queue
            .list(QueueFilter::new().with_status(Status::AudibleDownloading))?;

        for item in audible {
            self.poll_catalog_download(&item).await?;
        }

        Ok(())
    }

    async fn poll_torrent_download(&self, item: &QueueItem) -> Result<(), OrchestratorError> {
        let Some(client_id) = item.client_id.clone() else {
            debug!(item_id = item.id, "download has no client_id yet, attempting hash discovery");
            if let Some(discovered) = self.discover_client_id(item).await? {
                self.queue.update(
                    item.id,
                    {
                        let mut u = QueueItemUpdate::new();
                        u.client_id = Some(Some(discovered));
                        u
                    },
                )?;
            }
            return Ok(());
        };

        let snapshot = match self.download_client.status(&client_id).await {
            Ok(Some(s)) => s,
            Ok(None) => {
                debug!(item_id = item.id, client_id, "no snapshot yet for client_id");
                return Ok(());
            }
            Err(e) => {
                return self.fail(item, FailureKind::Download, e.to_string()).await;
            }
        };

        if let Some(save_path) = &snapshot.save_path {
            let expected = self.path_mapper.to_remote(&self.temp_dir_for(item.id).display().to_string());
            if *save_path != expected {
                warn!(item_id = item.id, expected, actual = save_path, "client save_path drifted, relocating");
                let _ = self.download_client.set_location(&client_id, &expected).await;
            }
        }

        let mut update = QueueItemUpdate::new();
        update.progress = Some(Some(snapshot.progress));
        update.eta_seconds = Some(Some(snapshot.eta_seconds));
        self.queue.update(item.id, update)?;
        self.events
            .emit(Event::DownloadProgress {
                id: item.id,
                progress: snapshot.progress,
                speed_bytes: Some(snapshot.download_speed_bps),
                eta_seconds: Some(snapshot.eta_seconds),
                message: None,
            })
            .await;

        if self.download_client.is_seeding_complete(&snapshot) {
            return self.fail(item, FailureKind::Download, "client reported terminal state".to_string()).await;
        }

        if snapshot.progress >= 100.0 {
            self.queue.update(item.id, QueueItemUpdate::new().with_status(Status::Complete))?;
            self.emit_state_changed(item.id, Status::Downloading, Status::Complete).await;
            self.events.emit(Event::DownloadCompleted { id: item.id }).await;
        }

        Ok(())
    }

    async fn discover_client_id(&self, item: &QueueItem) -> Result<Option<String>, OrchestratorError> {
        let snapshots = self.download_client.list().await?;
        let title_lower = item.title.to_lowercase();
        Ok(snapshots
            .into_iter()
            .find(|s| s.name.to_lowercase().contains(&title_lower))
            .map(|s| s.assigned_id))
    }

    async fn poll_catalog_download(&self, item: &QueueItem) -> Result<(), OrchestratorError> {
        if let Some(progress) = self.catalog_pool.take_progress(item.id) {
            let pct = progress
                .total_bytes
                .map(|t| (progress.downloaded_bytes as f64 / t as f64) * 100.0)
                .unwrap_or(0.0);
            let mut update = QueueItemUpdate::new();
            update.progress = Some(Some(pct));
            self.queue.update(item.id, update)?;
            self.events
                .emit(Event::DownloadProgress {
                    id: item.id,
                    progress: pct,
                    speed_bytes: None,
                    eta_seconds: None,
                    message: Some(progress.message),
                })
                .await;
        }

        if let Some(result) = self.catalog_pool.take_result(item.id) {
            match result {
                Ok(outcome) => {
                    let mut update = QueueItemUpdate::new().with_status(Status::Complete);
                    update.temp_path = Some(Some(outcome.audio_path));
                    update.voucher_path = Some(outcome.voucher_path);
                    update.format = Some(Some(outcome.format));
                    update.completed_at = Some(Some(Utc::now()));
                    self.queue.update(item.id, update)?;
                    self.emit_state_changed(item.id, Status::AudibleDownloading, Status::Complete).await;
                    self.events.emit(Event::DownloadCompleted { id: item.id }).await;
                }
                Err(crate::catalog_worker::CatalogWorkerError::Cancelled) => {
                    debug!(item_id = item.id, "catalog download cancelled, leaving cleanup to cancel()");
                }
                Err(e) => {
                    self.fail(item, FailureKind::AudibleDownload, e.to_string()).await?;
                }
            }
        }

        Ok(())
    }

    // ---- process_pipeline --------------------------------------------------

    async fn process_pipeline(&self) -> Result<(), OrchestratorError> {
        let complete = self.queue.list(QueueFilter::new().with_status(Status::Complete))?;
        for item in complete {
            self.advance_from_complete(&item).await?;
        }

        let converted = self.queue.list(QueueFilter::new().with_status(Status::Converted))?;
        for item in converted {
            self.queue.update(item.id, QueueItemUpdate::new().with_status(Status::Importing))?;
            self.emit_state_changed(item.id, Status::Converted, Status::Importing).await;
        }

        let importing = self.queue.list(QueueFilter::new().with_status(Status::Importing))?;
        for item in importing {
            self.run_import(&item).await?;
        }

        let seeding = self.queue.list(QueueFilter::new().with_status(Status::Seeding))?;
        for item in seeding {
            self.poll_seeding(&item).await?;
        }

        Ok(())
    }

    async fn advance_from_complete(&self, item: &QueueItem) -> Result<(), OrchestratorError> {
        let artifact = match self.locate_artifact(item) {
            Some(path) => path,
            None => {
                return self.fail(item, FailureKind::Conversion, "no artifact found under temp_path".to_string()).await;
            }
        };

        if !self.conversion_required(item, &artifact) {
            self.queue.update(item.id, QueueItemUpdate::new().with_status(Status::Importing))?;
            self.emit_state_changed(item.id, Status::Complete, Status::Importing).await;
            return Ok(());
        }

        if item.format.as_deref() == Some("encrypted-b") && item.voucher_path.is_none() {
            self.queue.update(
                item.id,
                QueueItemUpdate::new()
                    .with_status(Status::ConversionFailed)
                    .with_last_error("encrypted-b artifact without voucher"),
            )?;
            self.emit_state_changed(item.id, Status::Complete, Status::ConversionFailed).await;
            return Ok(());
        }

        self.queue.update(item.id, QueueItemUpdate::new().with_status(Status::Converting))?;
        self.emit_state_changed(item.id, Status::Complete, Status::Converting).await;

        let output_path = self.config.temp_conversion_path.join(format!("{}.out", item.id));
        let job = ConversionJob {
            job_id: item.id.to_string(),
            input_path: artifact,
            output_path,
            constraints: ConversionConstraints::default(),
            metadata: None,
            cover_art_path: None,
        };

        match self.converter.convert(job).await {
            Ok(result) => {
                let mut update = QueueItemUpdate::new().with_status(Status::Converted);
                update.converted_path = Some(Some(result.output_path.display().to_string()));
                update.format = Some(Some(result.output_format));
                self.queue.update(item.id, update)?;
                self.emit_state_changed(item.id, Status::Converting, Status::Converted).await;
                Ok(())
            }
            Err(e) => self.fail(item, FailureKind::Conversion, e.to_string()).await,
        }
    }

    fn conversion_required(&self, item: &QueueItem, artifact: &Path) -> bool {
        if item.kind == ItemKind::Catalog {
            return true;
        }
        let fmt = item.format.as_deref().unwrap_or("");
        if ENCRYPTED_FORMATS.contains(&fmt) {
            return true;
        }
        artifact
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| ENCRYPTED_FORMATS.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false)
    }

    fn locate_artifact(&self, item: &QueueItem) -> Option<PathBuf> {
        let temp_path = item.temp_path.as_ref()?;
        let path = PathBuf::from(temp_path);
        if path.is_file() {
            return Some(path);
        }
        if !path.is_dir() {
            return None;
        }

        let mut best: Option<(PathBuf, u64, usize)> = None;
        for entry in walk_files(&path) {
            let ext = entry
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase());
            let Some(ext) = ext else { continue };
            let Some(rank) = ARTIFACT_EXTENSIONS.iter().position(|e| *e == ext) else {
                continue;
            };
            let size = std::fs::metadata(&entry).map(|m| m.len()).unwrap_or(0);
            let better = match &best {
                None => true,
                Some((_, best_size, best_rank)) => {
                    rank < *best_rank || (rank == *best_rank && size > *best_size)
                }
            };
            if better {
                best = Some((entry, size, rank));
            }
        }
        best.map(|(path, _, _)| path)
    }

    async fn run_import(&self, item: &QueueItem) -> Result<(), OrchestratorError> {
        let source = item
            .converted_path
            .clone()
            .or_else(|| item.temp_path.clone());
        let Some(source) = source else {
            return self.fail(item, FailureKind::Import, "no source path for import".to_string()).await;
        };

        let destination = self.naming_destination(item);
        let seeding_applies = item.kind == ItemKind::Torrent && self.config.seeding_enabled;

        let placement = PlacementJob {
            job_id: item.id.to_string(),
            files: vec![FilePlacement {
                item_id: item.id.to_string(),
                source: PathBuf::from(&source),
                destination: destination.clone(),
                overwrite: false,
                verify_checksum: Some(ChecksumType::Sha256),
            }],
            atomic: !seeding_applies,
            cleanup_sources: !seeding_applies,
            enable_rollback: true,
        };

        match self.placer.place(placement).await {
            Ok(result) => {
                let mut update = QueueItemUpdate::new().with_status(Status::Imported);
                update.final_path = Some(
                    result
                        .files_placed
                        .first()
                        .map(|f| f.destination.display().to_string()),
                );
                update.completed_at = Some(Some(Utc::now()));
                self.queue.update(item.id, update)?;
                self.emit_state_changed(item.id, Status::Importing, Status::Imported).await;

                if seeding_applies {
                    self.queue.update(item.id, QueueItemUpdate::new().with_status(Status::Seeding))?;
                    self.emit_state_changed(item.id, Status::Imported, Status::Seeding).await;
                } else {
                    self.finish_item(item.id).await?;
                }
                Ok(())
            }
            Err(e) => self.fail(item, FailureKind::Import, e.to_string()).await,
        }
    }

    fn naming_destination(&self, item: &QueueItem) -> PathBuf {
        let sanitize = |s: &str| -> String {
            s.chars()
                .filter(|c| !"/\\:*?\"<>|".contains(*c))
                .collect()
        };
        let format = item.format.as_deref().unwrap_or("m4b");
        let rendered = self
            .config
            .naming_template
            .replace("{author}", &sanitize(&item.author))
            .replace("{title}", &sanitize(&item.title))
            .replace("{year}", "unknown")
            .replace("{format}", &sanitize(format));
        self.config.library_root.join(rendered)
    }

    async fn poll_seeding(&self, item: &QueueItem) -> Result<(), OrchestratorError> {
        let Some(client_id) = item.client_id.clone() else {
            return self.finish_item(item.id).await;
        };

        let snapshot = match self.download_client.status(&client_id).await {
            Ok(Some(s)) => s,
            Ok(None) => return self.finish_item(item.id).await,
            Err(e) => return self.fail(item, FailureKind::Download, e.to_string()).await,
        };

        let ratio_met = self
            .config
            .seed_ratio_limit
            .map(|limit| snapshot.ratio >= limit)
            .unwrap_or(false);
        let time_met = self
            .config
            .seed_time_limit_seconds
            .map(|limit| snapshot.seeding_time_seconds >= limit)
            .unwrap_or(false);
        let terminal = self.download_client.is_seeding_complete(&snapshot);

        if ratio_met || time_met || terminal {
            let _ = self
                .download_client
                .remove(&client_id, self.config.delete_source_after_import)
                .await;
            self.queue.update(item.id, QueueItemUpdate::new().with_status(Status::SeedingComplete))?;
            self.emit_state_changed(item.id, Status::Seeding, Status::SeedingComplete).await;
            self.finish_item(item.id).await?;
        }

        Ok(())
    }

    /// Cleans up a terminally-resolved item from the queue (the pipeline's
    /// "perform cleanup and delete the queue item").
    async fn finish_item(&self, id: i64) -> Result<(), OrchestratorError> {
        self.queue.delete(id)?;
        self.events.emit(Event::QueueUpdated {}).await;
        Ok(())
    }

    // ---- cancellation -------------------------------------------------------

    pub async fn cancel(&self, id: i64) -> Result<(), OrchestratorError> {
        let item = self.queue.get(id)?;

        if matches!(item.status, Status::Imported | Status::Cancelled | Status::SeedingComplete) {
            return Err(OrchestratorError::InvalidState {
                expected: "any non-terminal state".to_string(),
                actual: item.status.as_str().to_string(),
            });
        }

        match item.status {
            Status::AudibleDownloading => {
                self.catalog_pool.cancel(id);
            }
            Status::Downloading | Status::Paused => {
                if let Some(client_id) = &item.client_id {
                    let _ = self.download_client.remove(client_id, true).await;
                }
            }
            _ => {}
        }

        if let Some(temp_path) = &item.temp_path {
            let _ = std::fs::remove_dir_all(temp_path);
        }

        self.queue.delete(id)?;
        self.events.emit(Event::DownloadCancelled { id }).await;
        Ok(())
    }

    // ---- shared helpers ----------------------------------------------------

    fn temp_dir_for(&self, id: i64) -> PathBuf {
        self.config.temp_download_path.join(id.to_string())
    }

    async fn fail(&self, item: &QueueItem, kind: FailureKind, reason: String) -> Result<(), OrchestratorError> {
        warn!(item_id = item.id, kind = ?kind, reason, "queue item failed");
        match self.retry_policy.handle_failure(kind, item.retry_count) {
            RetryOutcome::Retry { target, retry_count, next_retry_at } => {
                let mut update = QueueItemUpdate::new().with_status(target);
                update.retry_count = Some(retry_count);
                update.next_retry_at = Some(next_retry_at);
                update.last_error = Some(Some(reason));
                self.queue.update(item.id, update)?;
                self.emit_state_changed(item.id, item.status, target).await;
            }
            RetryOutcome::Permanent { failed_status } => {
                let update = QueueItemUpdate::new()
                    .with_status(failed_status)
                    .with_last_error(reason.clone());
                self.queue.update(item.id, update)?;
                self.emit_state_changed(item.id, item.status, failed_status).await;
                self.events
                    .emit(Event::DownloadFailed { id: item.id, error: reason })
                    .await;
            }
        }
        Ok(())
    }

    async fn emit_state_changed(&self, id: i64, old: Status, new: Status) {
        self.events
            .emit(Event::StateChanged {
                id,
                old: old.as_str().to_string(),
                new: new.as_str().to_string(),
            })
            .await;
    }
}

fn walk_files(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return out;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            out.extend(walk_files(&path));
        } else {
            out.push(path);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_worker::CatalogOwnership;
    use crate::converter::{ConversionResult, ConverterError, MediaInfo};
    use crate::placer::{PlacedFile, PlacerError, RollbackPlan, RollbackResult};
    use crate::catalog_worker::ProgressCb;
    use crate::searcher::CandidateKind;
    use crate::queue::{EnqueueRequest, MemoryQueueStore, PreSelectedSource};
    use crate::searcher::SearchAdapterError;
    use crate::torrent_client::{DownloadClientError, DownloadSnapshot};
    use async_trait::async_trait;

    struct AlwaysOwned;
    #[async_trait]
    impl CatalogOwnership for AlwaysOwned {
        async fn is_owned(&self, _catalog_id: &str) -> bool {
            true
        }
    }

    struct NoopWorker;
    #[async_trait]
    impl crate::catalog_worker::CatalogDownloadWorker for NoopWorker {
        async fn download(
            &self,
            _request: CatalogDownloadRequest,
            _progress_cb: ProgressCb,
            _cancel_token: crate::catalog_worker::CancelToken,
        ) -> Result<crate::catalog_worker::CatalogDownloadOutcome, crate::catalog_worker::CatalogWorkerError> {
            unimplemented!("not exercised by these tests")
        }
    }

    struct EmptySearch;
    #[async_trait]
    impl SearchAdapter for EmptySearch {
        async fn search(
            &self,
            _title: &str,
            _author: &str,
            _catalog_id: &str,
        ) -> Result<Vec<crate::searcher::CandidateSource>, SearchAdapterError> {
            Ok(vec![])
        }
    }

    struct StaticSearch {
        confidence: u8,
    }
    #[async_trait]
    impl SearchAdapter for StaticSearch {
        async fn search(
            &self,
            _title: &str,
            _author: &str,
            _catalog_id: &str,
        ) -> Result<Vec<crate::searcher::CandidateSource>, SearchAdapterError> {
            Ok(vec![crate::searcher::CandidateSource {
                source_url: "https://example.invalid/a.torrent".to_string(),
                source_info_hash: Some("hash1".to_string()),
                indexer_name: "stub".to_string(),
                kind: CandidateKind::Torrent,
                size_bytes: 1000,
                seeders: 5,
                confidence_score: self.confidence,
            }])
        }
    }

    struct NoopDownloadClient;
    #[async_trait]
    impl DownloadClientAdapter for NoopDownloadClient {
        async fn add(&self, _source: AddTorrentRequest, _category: Option<String>) -> Result<String, DownloadClientError> {
            Ok("H1".to_string())
        }
        async fn status(&self, _assigned_id: &str) -> Result<Option<DownloadSnapshot>, DownloadClientError> {
            Ok(None)
        }
        async fn list(&self) -> Result<Vec<DownloadSnapshot>, DownloadClientError> {
            Ok(vec![])
        }
        async fn pause(&self, _assigned_id: &str) -> Result<(), DownloadClientError> {
            Ok(())
        }
        async fn resume(&self, _assigned_id: &str) -> Result<(), DownloadClientError> {
            Ok(())
        }
        async fn remove(&self, _assigned_id: &str, _delete_files: bool) -> Result<(), DownloadClientError> {
            Ok(())
        }
        async fn set_location(&self, _assigned_id: &str, _save_path: &str) -> Result<bool, DownloadClientError> {
            Ok(false)
        }
    }

    struct NoopConverter;
    #[async_trait]
    impl Converter for NoopConverter {
        fn name(&self) -> &str {
            "noop"
        }
        async fn probe(&self, path: &Path) -> Result<MediaInfo, ConverterError> {
            Ok(MediaInfo {
                path: path.to_path_buf(),
                size_bytes: 0,
                duration_secs: 0.0,
                format: "m4b".to_string(),
                audio_codec: None,
                audio_bitrate_kbps: None,
                audio_sample_rate: None,
                audio_channels: None,
                video_codec: None,
                video_width: None,
                video_height: None,
                video_fps: None,
            })
        }
        async fn convert(&self, job: ConversionJob) -> Result<ConversionResult, ConverterError> {
            Ok(ConversionResult {
                job_id: job.job_id,
                output_path: job.output_path,
                output_size_bytes: 0,
                duration_ms: 0,
                input_format: "m4b".to_string(),
                output_format: "m4b".to_string(),
            })
        }
        async fn convert_with_progress(
            &self,
            job: ConversionJob,
            _progress_tx: tokio::sync::mpsc::Sender<crate::converter::ConversionProgress>,
        ) -> Result<ConversionResult, ConverterError> {
            self.convert(job).await
        }
        async fn validate(&self) -> Result<(), ConverterError> {
            Ok(())
        }
    }

    struct NoopPlacer;
    #[async_trait]
    impl Placer for NoopPlacer {
        fn name(&self) -> &str {
            "noop"
        }
        async fn place(&self, job: PlacementJob) -> Result<crate::placer::PlacementResult, PlacerError> {
            Ok(crate::placer::PlacementResult {
                job_id: job.job_id,
                files_placed: job
                    .files
                    .iter()
                    .map(|f| PlacedFile {
                        item_id: f.item_id.clone(),
                        destination: f.destination.clone(),
                        size_bytes: 0,
                        checksum: None,
                    })
                    .collect(),
                total_bytes: 0,
                duration_ms: 0,
            })
        }
        async fn place_with_progress(
            &self,
            job: PlacementJob,
            _progress_tx: tokio::sync::mpsc::Sender<crate::placer::PlacementProgress>,
        ) -> Result<crate::placer::PlacementResult, PlacerError> {
            self.place(job).await
        }
        async fn rollback(&self, plan: RollbackPlan) -> RollbackResult {
            RollbackResult {
                job_id: plan.job_id,
                files_removed: 0,
                directories_removed: 0,
                errors: vec![],
                success: true,
            }
        }
        async fn validate(&self) -> Result<(), PlacerError> {
            Ok(())
        }
    }

    fn orchestrator_with(
        search: Arc<dyn SearchAdapter>,
        download_client: Arc<dyn DownloadClientAdapter>,
    ) -> (Arc<Orchestrator<NoopConverter, NoopPlacer>>, Arc<dyn QueueStore>) {
        let queue: Arc<dyn QueueStore> = Arc::new(MemoryQueueStore::new());
        let pool = Arc::new(CatalogWorkerPool::new(Arc::new(NoopWorker), Arc::new(AlwaysOwned), 1));
        let (events, _rx) = crate::events::event_channel(64);
        let orchestrator = Arc::new(Orchestrator::new(
            OrchestratorConfig::default(),
            queue.clone(),
            search,
            download_client,
            pool,
            Arc::new(NoopConverter),
            Arc::new(NoopPlacer),
            events,
            None,
        ));
        (orchestrator, queue)
    }

    #[tokio::test]
    async fn queued_item_with_no_candidates_moves_to_search_failed_after_budget() {
        let (orchestrator, queue) = orchestrator_with(Arc::new(EmptySearch), Arc::new(NoopDownloadClient));
        let item = queue
            .enqueue(EnqueueRequest {
                catalog_id: "C1".to_string(),
                priority: 5,
                kind: ItemKind::Torrent,
                title: "The Hobbit".to_string(),
                author: "Tolkien".to_string(),
                pre_selected_source: None,
            })
            .unwrap();

        for _ in 0..3 {
            orchestrator.tick().await.unwrap();
        }

        let updated = queue.get(item.id).unwrap();
        assert_eq!(updated.status, Status::SearchFailed);
        assert_eq!(updated.retry_count, 3);
    }

    #[tokio::test]
    async fn preselected_source_skips_search() {
        let (orchestrator, queue) = orchestrator_with(Arc::new(EmptySearch), Arc::new(NoopDownloadClient));
        let item = queue
            .enqueue(EnqueueRequest {
                catalog_id: "C2".to_string(),
                priority: 5,
                kind: ItemKind::Torrent,
                title: "Dune".to_string(),
                author: "Herbert".to_string(),
                pre_selected_source: Some(PreSelectedSource {
                    source_url: "magnet:?xt=urn:btih:abc".to_string(),
                    source_info_hash: Some("abc".to_string()),
                }),
            })
            .unwrap();

        orchestrator.tick().await.unwrap();

        let updated = queue.get(item.id).unwrap();
        assert_eq!(updated.status, Status::Downloading);
        assert_eq!(updated.client_id, Some("H1".to_string()));
    }

    #[tokio::test]
    async fn high_confidence_search_result_reaches_downloading() {
        let (orchestrator, queue) =
            orchestrator_with(Arc::new(StaticSearch { confidence: 90 }), Arc::new(NoopDownloadClient));
        let item = queue
            .enqueue(EnqueueRequest {
                catalog_id: "C3".to_string(),
                priority: 5,
                kind: ItemKind::Torrent,
                title: "Foundation".to_string(),
                author: "Asimov".to_string(),
                pre_selected_source: None,
            })
            .unwrap();

        orchestrator.tick().await.unwrap();

        let updated = queue.get(item.id).unwrap();
        assert_eq!(updated.status, Status::Downloading);
    }

    #[tokio::test]
    async fn duplicate_enqueue_is_rejected_by_the_store() {
        let (_orchestrator, queue) = orchestrator_with(Arc::new(EmptySearch), Arc::new(NoopDownloadClient));
        let request = || EnqueueRequest {
            catalog_id: "C4".to_string(),
            priority: 1,
            kind: ItemKind::Torrent,
            title: "Title".to_string(),
            author: "Author".to_string(),
            pre_selected_source: None,
        };
        assert!(queue.enqueue(request()).is_ok());
        assert!(matches!(
            queue.enqueue(request()),
            Err(crate::queue::QueueStoreError::DuplicateActiveCatalogId(_))
        ));
    }

    #[tokio::test]
    async fn cancel_deletes_a_downloading_item() {
        let (orchestrator, queue) = orchestrator_with(Arc::new(EmptySearch), Arc::new(NoopDownloadClient));
        let item = queue
            .enqueue(EnqueueRequest {
                catalog_id: "C5".to_string(),
                priority: 1,
                kind: ItemKind::Torrent,
                title: "Title".to_string(),
                author: "Author".to_string(),
                pre_selected_source: Some(PreSelectedSource {
                    source_url: "magnet:?xt=urn:btih:zzz".to_string(),
                    source_info_hash: None,
                }),
            })
            .unwrap();

        orchestrator.tick().await.unwrap();
        assert_eq!(queue.get(item.id).unwrap().status, Status::Downloading);

        orchestrator.cancel(item.id).await.unwrap();
        assert!(matches!(queue.get(item.id), Err(crate::queue::QueueStoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn cancel_is_rejected_from_terminal_states() {
        let (orchestrator, queue) = orchestrator_with(Arc::new(EmptySearch), Arc::new(NoopDownloadClient));
        let item = queue
            .enqueue(EnqueueRequest {
                catalog_id: "C6".to_string(),
                priority: 1,
                kind: ItemKind::Torrent,
                title: "Title".to_string(),
                author: "Author".to_string(),
                pre_selected_source: None,
            })
            .unwrap();
        queue
            .update(item.id, QueueItemUpdate::new().with_status(Status::Cancelled))
            .unwrap();

        let result = orchestrator.cancel(item.id).await;
        assert!(matches!(result, Err(OrchestratorError::InvalidState { .. })));
    }

    #[test]
    fn naming_template_substitutes_and_sanitizes() {
        let (orchestrator, _queue) = {
            let queue: Arc<dyn QueueStore> = Arc::new(MemoryQueueStore::new());
            let pool = Arc::new(CatalogWorkerPool::new(Arc::new(NoopWorker), Arc::new(AlwaysOwned), 1));
            let (events, _rx) = crate::events::event_channel(64);
            let mut config = OrchestratorConfig::default();
            config.naming_template = "{author}/{title}.{format}".to_string();
            (
                Arc::new(Orchestrator::new(
                    config,
                    queue.clone(),
                    Arc::new(EmptySearch) as Arc<dyn SearchAdapter>,
                    Arc::new(NoopDownloadClient) as Arc<dyn DownloadClientAdapter>,
                    pool,
                    Arc::new(NoopConverter),
                    Arc::new(NoopPlacer),
                    events,
                    None,
                )),
                queue,
            )
        };

        let item = QueueItem {
            id: 1,
            catalog_id: "C7".to_string(),
            status: Status::Importing,
            priority: 5,
            kind: ItemKind::Torrent,
            title: "Evil: The Sequel?".to_string(),
            author: "A/B".to_string(),
            pre_selected_source: None,
            source_url: None,
            source_info_hash: None,
            client_name: None,
            client_id: None,
            temp_path: None,
            voucher_path: None,
            converted_path: None,
            final_path: None,
            format: Some("m4b".to_string()),
            progress: None,
            eta_seconds: None,
            retry_count: 0,
            next_retry_at: None,
            last_error: None,
            queued_at: Utc::now(),
            started_at: None,
            completed_at: None,
            updated_at: Utc::now(),
            seeding_ratio: None,
            seeding_time_seconds: None,
        };

        let dest = orchestrator.naming_destination(&item);
        assert_eq!(dest, PathBuf::from("./library/AB/Evil The Sequel.m4b"));
    }
}
