//! The progress/event bus contract emitted to UI subscribers.
//!
//! `Event` enumerates the lifecycle events emitted; `EventSink` is a
//! cheaply-cloneable handle wrapping an async mpsc sender, following the same
//! `emit`/`emit_blocking`/`try_emit` shape as [`crate::audit::AuditHandle`] —
//! the core never calls into a transport directly, it just emits onto the
//! channel and whatever the deployment wants (WS fanout, log sink, test
//! collector) drains the receiver.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    #[serde(rename = "queue:item_added")]
    QueueItemAdded { id: i64, catalog_id: String },
    #[serde(rename = "download:started")]
    DownloadStarted { id: i64 },
    #[serde(rename = "download:progress")]
    DownloadProgress {
        id: i64,
        progress: f64,
        speed_bytes: Option<u64>,
        eta_seconds: Option<i64>,
        message: Option<String>,
    },
    #[serde(rename = "download:completed")]
    DownloadCompleted { id: i64 },
    #[serde(rename = "download:failed")]
    DownloadFailed { id: i64, error: String },
    #[serde(rename = "download:cancelled")]
    DownloadCancelled { id: i64 },
    #[serde(rename = "download:paused")]
    DownloadPaused { id: i64 },
    #[serde(rename = "download:resumed")]
    DownloadResumed { id: i64 },
    #[serde(rename = "state:changed")]
    StateChanged { id: i64, old: String, new: String },
    #[serde(rename = "queue:updated")]
    QueueUpdated {},
}

/// Cheaply-cloneable handle for emitting lifecycle events onto an async
/// channel. Dropping every clone closes the channel and lets a subscriber's
/// `recv` loop end.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::Sender<Event>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<Event>) -> Self {
        Self { tx }
    }

    /// Non-blocking; logs and drops the event if the channel is full or closed.
    pub async fn emit(&self, event: Event) {
        if let Err(e) = self.tx.send(event).await {
            tracing::warn!("failed to emit event: {}", e);
        }
    }

    /// For non-async call sites.
    pub fn emit_blocking(&self, event: Event) {
        if let Err(e) = self.tx.blocking_send(event) {
            tracing::warn!("failed to emit event: {}", e);
        }
    }

    /// Best-effort, never blocks; returns whether the send succeeded.
    pub fn try_emit(&self, event: Event) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("failed to emit event: {}", e);
                false
            }
        }
    }
}

/// Builds a connected `(EventSink, Receiver<Event>)` pair.
pub fn event_channel(buffer_size: usize) -> (EventSink, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(buffer_size);
    (EventSink::new(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_delivers_event() {
        let (sink, mut rx) = event_channel(4);
        sink.emit(Event::QueueItemAdded { id: 1, catalog_id: "C1".to_string() }).await;
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, Event::QueueItemAdded { id: 1, .. }));
    }

    #[test]
    fn try_emit_fails_once_channel_is_full() {
        let (sink, _rx) = event_channel(1);
        assert!(sink.try_emit(Event::QueueUpdated {}));
        assert!(!sink.try_emit(Event::QueueUpdated {}));
    }

    #[tokio::test]
    async fn cloned_sinks_share_the_channel() {
        let (sink, mut rx) = event_channel(4);
        let other = sink.clone();
        other.emit(Event::DownloadStarted { id: 7 }).await;
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, Event::DownloadStarted { id: 7 }));
    }
}
