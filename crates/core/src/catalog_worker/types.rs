//! Types for the bounded-pool catalog (DRM) download worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Format preference for a catalog download; the DRM-protected encodings are
/// named generically since the wire-level codec is an opaque adapter detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatPref {
    EncryptedA,
    EncryptedB,
    EncryptedAWithFallbackToB,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogDownloadRequest {
    pub catalog_id: String,
    pub output_dir: String,
    pub filename: String,
    pub format_pref: FormatPref,
    pub quality: String,
    pub allow_fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogDownloadOutcome {
    pub audio_path: String,
    pub voucher_path: Option<String>,
    pub format: String,
}

#[derive(Debug, Error)]
pub enum CatalogWorkerError {
    #[error("ownership not confirmed for catalog_id {0}")]
    OwnershipNotConfirmed(String),

    #[error("download cancelled")]
    Cancelled,

    #[error("network error: {0}")]
    Network(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("drm/voucher error: {0}")]
    Drm(String),

    #[error("worker pool exhausted")]
    PoolExhausted,
}

/// One-shot cooperative cancellation signal, checked at IO boundaries.
///
/// Grounded on the original source's per-download event object checked
/// opportunistically: kept as the same model rather than thread
/// interruption, implemented here with an `AtomicBool` since a single
/// consumer only ever needs to poll it.
#[derive(Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Incremental progress callback signature: `(downloaded_bytes, total_bytes, message)`.
pub type ProgressCb = Arc<dyn Fn(u64, Option<u64>, &str) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_starts_uncancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn cancel_token_clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
