//! Deduplication of torrent search results by info_hash.

use std::collections::HashMap;

use super::{RawTorrentResult, TorrentCandidate, TorrentSource};

/// Deduplicate raw torrent results by info_hash.
///
/// Results with the same info_hash are merged into a single `TorrentCandidate`
/// with multiple sources. Results without an info_hash are kept as separate
/// single-source candidates.
///
/// The final list is sorted by total seeders (descending).
pub fn deduplicate_results(raw: Vec<RawTorrentResult>) -> Vec<TorrentCandidate> {
    let mut by_hash: HashMap<String, TorrentCandidate> = HashMap::new();
    let mut no_hash: Vec<TorrentCandidate> = Vec::new();

    for r in raw {
        match r.info_hash {
            Some(hash) if !hash.is_empty() => {
                let hash = hash.to_lowercase();
                if let Some(existing) = by_hash.get_mut(&hash) {
                    // Add as additional source
                    existing.seeders += r.seeders;
                    existing.leechers += r.leechers;
                    existing.sources.push(TorrentSource {
                        indexer: r.indexer,
                        magnet_uri: r.magnet_uri,
                        torrent_url: r.torrent_url,
                        seeders: r.seeders,
                        leechers: r.leechers,
                        details_url: r.details_url,
                    });
                    // Keep earliest publish date
                    if let Some(date) = r.publish_date {
                        existing.publish_date = Some(match existing.publish_date {
                            Some(existing_date) => existing_date.min(date),
                            None => date,
                        });
                    }
                    // Keep files if we didn't have them
                    if existing.files.is_none() && r.files.is_some() {
                        existing.files = r.files;
                    }
                } else {
                    // First occurrence of this hash
                    by_hash.insert(
                        hash.clone(),
                        TorrentCandidate {
                            title: r.title,
                            info_hash: hash,
                            size_bytes: r.size_bytes,
                            seeders: r.seeders,
                            leechers: r.leechers,
                            category: r.category,
                            publish_date: r.publish_date,
                            files: r.files,
                            sources: vec![TorrentSource {
                                indexer: r.indexer,
                                magnet_uri: r.magnet_uri,
                                torrent_url: r.torrent_url,
                                seeders: r.seeders,
                                leechers: r.leechers,
                                details_url: r.details_url,
                            }],
                            from_cache: false,
                        },
                    );
                }
            }
            _ => {
                // No info_hash or empty - can't deduplicate, include as single-source result
                no_hash.push(TorrentCandidate {
                    title: r.title,
                    info_hash: String::new(), // Empty = unknown
                    size_bytes: r.size_bytes,
                    seeders: r.seeders,
                    leechers: r.leechers,
                    category: r.category,
                    publish_date: r.publish_date,
                    files: r.files,
                    sources: vec![TorrentSource {
                        indexer: r.indexer,
                        magnet_uri: r.magnet_uri,
                        torrent_url: r.torrent_url,
                        seeders: r.seeders,
                        leechers: r.leechers,
                        details_url: r.details_url,
                    }],
                    from_cache: false,
                });
            }
        }
    }

    let mut results: Vec<_> = by_hash.into_values().chain(no_hash).collect();
    // Sort by total seeders descending
    results.sort_by(|a, b| b.seeders.cmp(&a.seeders));
    results
}
