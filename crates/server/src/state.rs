use std::sync::Arc;

use bookwright_core::{
    AuditHandle, AuditStore, Config, FfmpegConverter, FsPlacer, Orchestrator, QueueStore,
    SanitizedConfig,
};

/// Type alias for the concrete orchestrator we use.
pub type AppOrchestrator = Orchestrator<FfmpegConverter, FsPlacer>;

/// Shared application state for the minimal observability surface (the
/// core renders no UI and exposes no HTTP API of its own; this binary only
/// serves health/metrics scraping endpoints around it).
pub struct AppState {
    config: Config,
    audit_handle: AuditHandle,
    audit_store: Arc<dyn AuditStore>,
    queue: Arc<dyn QueueStore>,
    orchestrator: Arc<AppOrchestrator>,
}

impl AppState {
    pub fn new(
        config: Config,
        audit_handle: AuditHandle,
        audit_store: Arc<dyn AuditStore>,
        queue: Arc<dyn QueueStore>,
        orchestrator: Arc<AppOrchestrator>,
    ) -> Self {
        Self {
            config,
            audit_handle,
            audit_store,
            queue,
            orchestrator,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn audit(&self) -> &AuditHandle {
        &self.audit_handle
    }

    #[allow(dead_code)]
    pub fn audit_store(&self) -> &Arc<dyn AuditStore> {
        &self.audit_store
    }

    pub fn queue(&self) -> &Arc<dyn QueueStore> {
        &self.queue
    }

    pub fn orchestrator(&self) -> &Arc<AppOrchestrator> {
        &self.orchestrator
    }
}
