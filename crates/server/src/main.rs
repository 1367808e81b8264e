mod catalog_stub;
mod metrics;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bookwright_core::{
    create_audit_system, event_channel, load_config, validate_config, AuditEvent, AuditStore,
    CatalogWorkerPool, FfmpegConverter, FsPlacer, IndexerSearchAdapter, JackettSearcher,
    Orchestrator, QBittorrentClient, SqliteAuditStore, SqliteQueueStore,
    TorrentClientDownloadAdapter,
};

use catalog_stub::{UnconfiguredCatalogOwnership, UnconfiguredCatalogWorker};
use state::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const AUDIT_BUFFER_SIZE: usize = 1000;
const EVENT_BUFFER_SIZE: usize = 256;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::var("BOOKWRIGHT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("failed to load config from {:?}", config_path))?;
    validate_config(&config).context("configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    let config_hash_short = &config_hash[..16];

    let audit_store: Arc<dyn AuditStore> = Arc::new(
        SqliteAuditStore::new(&config.database.path).context("failed to create audit store")?,
    );

    let queue = Arc::new(
        SqliteQueueStore::new(&config.database.path).context("failed to create queue store")?,
    );

    let (audit_handle, audit_writer) =
        create_audit_system(Arc::clone(&audit_store), AUDIT_BUFFER_SIZE);
    let writer_handle = tokio::spawn(audit_writer.run());

    audit_handle
        .emit(AuditEvent::ServiceStarted {
            version: VERSION.to_string(),
            config_hash: config_hash_short.to_string(),
        })
        .await;

    let search_adapter = Arc::new(IndexerSearchAdapter::new(JackettSearcher::new(
        config.jackett.clone(),
    )));

    let download_client = Arc::new(TorrentClientDownloadAdapter::new(QBittorrentClient::new(
        config.qbittorrent.clone(),
    )));

    let catalog_pool = Arc::new(CatalogWorkerPool::new(
        Arc::new(UnconfiguredCatalogWorker),
        Arc::new(UnconfiguredCatalogOwnership),
        config.orchestrator.catalog_concurrency,
    ));

    let converter = Arc::new(FfmpegConverter::new(config.converter.clone()));
    let placer = Arc::new(FsPlacer::new(config.placer.clone()));

    let (event_sink, mut event_rx) = event_channel(EVENT_BUFFER_SIZE);
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            tracing::debug!(?event, "queue event");
        }
    });

    let orchestrator = Arc::new(Orchestrator::new(
        config.orchestrator.clone(),
        queue.clone(),
        search_adapter,
        download_client,
        catalog_pool,
        converter,
        placer,
        event_sink,
        Some(audit_handle.clone()),
    ));
    orchestrator.start();
    info!("orchestrator started");

    metrics::register_metrics();

    let state = Arc::new(AppState::new(
        config.clone(),
        audit_handle.clone(),
        audit_store,
        queue,
        orchestrator.clone(),
    ));

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("stopping orchestrator...");
    orchestrator.stop().await;
    info!("orchestrator stopped");

    audit_handle
        .emit(AuditEvent::ServiceStopped {
            reason: "graceful_shutdown".to_string(),
        })
        .await;

    drop(orchestrator);
    drop(audit_handle);

    let _ = writer_handle.await;
    info!("audit writer stopped");

    Ok(())
}

async fn healthz(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, axum::Json<serde_json::Value>) {
    let status = state.orchestrator().status();
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({
            "status": "ok",
            "orchestrator_running": status.running,
        })),
    )
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    metrics::collect_dynamic_metrics(state.orchestrator().as_ref());
    metrics::encode_metrics()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
