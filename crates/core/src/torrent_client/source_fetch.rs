//! Source-fetch bridge and loopback URL rewriting.
//!
//! The download client may not be able to reach the origin of a torrent
//! source URL directly (it can resolve to the orchestrator's own localhost,
//! or require session cookies the client doesn't have). The orchestrator
//! fetches the payload itself and hands bytes — or a discovered magnet — to
//! the client.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SourceFetchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("source url is a loopback address with no external_base_url_override configured")]
    LoopbackWithoutOverride,

    #[error("direct provider session rejected (401/403) after reload")]
    SessionRejected,

    #[error("fetch failed: {0}")]
    Other(String),
}

/// What the bridge resolved a source URL to.
pub enum FetchedSource {
    Magnet(String),
    TorrentBytes(Vec<u8>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectProviderSession {
    pub host: String,
    pub session_token: String,
    pub base_url: String,
}

/// Fetches torrent payloads on the orchestrator's behalf, rewriting loopback
/// URLs and attaching direct-provider session cookies as configured.
pub struct SourceFetcher {
    client: Client,
    external_base_url_override: Option<String>,
    direct_provider_sessions: HashMap<String, DirectProviderSession>,
}

impl SourceFetcher {
    pub fn new(
        external_base_url_override: Option<String>,
        direct_provider_sessions: HashMap<String, DirectProviderSession>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("failed to build source-fetch HTTP client");

        Self {
            client,
            external_base_url_override,
            direct_provider_sessions,
        }
    }

    fn is_loopback(url: &Url) -> bool {
        match url.host_str() {
            Some(host) => host == "localhost" || host == "127.0.0.1" || host == "::1",
            None => false,
        }
    }

    /// Rewrites a loopback `source_url` using `external_base_url_override`,
    /// preserving path/query/fragment. Fails if the URL is loopback and no
    /// override is configured.
    pub fn rewrite_url(&self, source_url: &str) -> Result<String, SourceFetchError> {
        if source_url.starts_with("magnet:") {
            return Ok(source_url.to_string());
        }

        let parsed = Url::parse(source_url).map_err(|e| SourceFetchError::Other(e.to_string()))?;
        if !Self::is_loopback(&parsed) {
            return Ok(source_url.to_string());
        }

        let Some(base) = &self.external_base_url_override else {
            return Err(SourceFetchError::LoopbackWithoutOverride);
        };

        let base = Url::parse(base).map_err(|e| SourceFetchError::Other(e.to_string()))?;
        let mut rewritten = base;
        rewritten.set_path(parsed.path());
        rewritten.set_query(parsed.query());
        rewritten.set_fragment(parsed.fragment());
        Ok(rewritten.to_string())
    }

    /// Resolves a candidate source down to a fetchable torrent/magnet.
    pub async fn fetch(&self, source_url: &str) -> Result<FetchedSource, SourceFetchError> {
        if source_url.starts_with("magnet:") {
            return Ok(FetchedSource::Magnet(source_url.to_string()));
        }

        let rewritten = self.rewrite_url(source_url)?;
        let host = Url::parse(&rewritten)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string));

        let session = host.as_deref().and_then(|h| self.direct_provider_sessions.get(h));

        let outcome = self.do_fetch(&rewritten, session).await;

        match outcome {
            Err(SourceFetchError::SessionRejected) => {
                warn!(source_url = %rewritten, "direct provider session rejected, reloading once");
                self.do_fetch(&rewritten, session).await
            }
            other => other,
        }
    }

    async fn do_fetch(
        &self,
        url: &str,
        session: Option<&DirectProviderSession>,
    ) -> Result<FetchedSource, SourceFetchError> {
        let mut request = self.client.get(url).header("Accept", "application/x-bittorrent");
        if let Some(session) = session {
            request = request.header("Cookie", format!("session={}", session.session_token));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SourceFetchError::Timeout
            } else if e.is_connect() {
                SourceFetchError::ConnectionFailed(e.to_string())
            } else {
                SourceFetchError::Other(e.to_string())
            }
        })?;

        let status = response.status();

        if status.is_redirection() {
            if let Some(location) = response.headers().get("location").and_then(|v| v.to_str().ok()) {
                if location.starts_with("magnet:") {
                    return Ok(FetchedSource::Magnet(location.to_string()));
                }
            }
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            if session.is_some() {
                return Err(SourceFetchError::SessionRejected);
            }
            return Err(SourceFetchError::Other(format!("unexpected status {}", status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SourceFetchError::Other(e.to_string()))?;

        if let Ok(text) = std::str::from_utf8(&bytes) {
            let trimmed = text.trim_start();
            if trimmed.starts_with("magnet:") {
                debug!("resolved torrent_url body to a magnet URI");
                return Ok(FetchedSource::Magnet(trimmed.to_string()));
            }
        }

        Ok(FetchedSource::TorrentBytes(bytes.to_vec()))
    }
}
