//! The `SearchAdapter` contract consumed by the orchestrator.
//!
//! Wraps the existing indexer-facing [`Searcher`] trait (Jackett today,
//! Prowlarr-shaped tomorrow) behind the orchestrator's narrower contract:
//! `search(title, author, catalog_id) -> [CandidateSource]` ranked by
//! confidence. The indexer plumbing (rate limiting, dedup, per-indexer
//! errors) is unchanged; only this translation layer at the edge is new.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{SearchCategory, SearchQuery, Searcher, TorrentCandidate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    Torrent,
    Magnet,
}

/// A ranked search result. Never persisted directly; the
/// orchestrator copies the winning candidate's fields onto the `QueueItem`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSource {
    pub source_url: String,
    pub source_info_hash: Option<String>,
    pub indexer_name: String,
    pub kind: CandidateKind,
    pub size_bytes: u64,
    pub seeders: u32,
    pub confidence_score: u8,
}

#[derive(Debug, Error)]
pub enum SearchAdapterError {
    #[error(transparent)]
    Backend(#[from] super::SearchError),
}

/// Side-effect-free: never mutates queue items.
#[async_trait]
pub trait SearchAdapter: Send + Sync {
    async fn search(
        &self,
        title: &str,
        author: &str,
        catalog_id: &str,
    ) -> Result<Vec<CandidateSource>, SearchAdapterError>;
}

/// Adapts any [`Searcher`] (Jackett, or a mock) to the `SearchAdapter`
/// contract, scoring each deduplicated candidate by title/author overlap
/// weighted toward exact-phrase matches, with a seeder-count tiebreaker.
pub struct IndexerSearchAdapter<S: Searcher> {
    searcher: S,
}

impl<S: Searcher> IndexerSearchAdapter<S> {
    pub fn new(searcher: S) -> Self {
        Self { searcher }
    }

    fn confidence(title: &str, author: &str, candidate: &TorrentCandidate) -> u8 {
        let haystack = candidate.title.to_lowercase();
        let title_words: Vec<String> = title
            .to_lowercase()
            .split_whitespace()
            .map(String::from)
            .collect();
        let author_words: Vec<String> = author
            .to_lowercase()
            .split_whitespace()
            .map(String::from)
            .collect();

        if title_words.is_empty() {
            return 0;
        }

        let title_hits = title_words.iter().filter(|w| haystack.contains(w.as_str())).count();
        let author_hits = author_words.iter().filter(|w| haystack.contains(w.as_str())).count();

        let title_ratio = title_hits as f64 / title_words.len() as f64;
        let author_ratio = if author_words.is_empty() {
            1.0
        } else {
            author_hits as f64 / author_words.len() as f64
        };

        // Title match dominates; author match is a smaller corroborating signal.
        let base = title_ratio * 80.0 + author_ratio * 15.0;
        let seeder_bonus = (candidate.seeders.min(50) as f64 / 50.0) * 5.0;

        (base + seeder_bonus).clamp(0.0, 100.0).round() as u8
    }
}

#[async_trait]
impl<S: Searcher> SearchAdapter for IndexerSearchAdapter<S> {
    async fn search(
        &self,
        title: &str,
        author: &str,
        catalog_id: &str,
    ) -> Result<Vec<CandidateSource>, SearchAdapterError> {
        let query = SearchQuery {
            query: format!("{} {}", author, title).trim().to_string(),
            indexers: None,
            categories: Some(vec![SearchCategory::Audio, SearchCategory::Books]),
            limit: Some(50),
        };

        tracing::debug!(catalog_id, query = %query.query, "dispatching search");
        let result = self.searcher.search(&query).await?;

        let mut candidates: Vec<CandidateSource> = result
            .candidates
            .into_iter()
            .filter_map(|c| {
                let source = c.sources.first()?;
                let source_url = source
                    .torrent_url
                    .clone()
                    .or_else(|| source.magnet_uri.clone())?;
                let kind = if source.magnet_uri.is_some() && source.torrent_url.is_none() {
                    CandidateKind::Magnet
                } else {
                    CandidateKind::Torrent
                };
                let confidence = Self::confidence(title, author, &c);
                Some(CandidateSource {
                    source_url,
                    source_info_hash: if c.info_hash.is_empty() {
                        None
                    } else {
                        Some(c.info_hash)
                    },
                    indexer_name: source.indexer.clone(),
                    kind,
                    size_bytes: c.size_bytes,
                    seeders: c.seeders,
                    confidence_score: confidence,
                })
            })
            .collect();

        candidates.sort_by(|a, b| b.confidence_score.cmp(&a.confidence_score));
        Ok(candidates)
    }
}
