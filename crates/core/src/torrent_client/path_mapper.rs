//! Translation layer between the orchestrator's filesystem view and the
//! download client's filesystem view, per the re-architecture
//! guidance: a `PathMapper` object constructed once from configuration,
//! rather than per-call string rewriting.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathMapping {
    pub remote: String,
    pub local: String,
}

#[derive(Debug, Clone, Default)]
pub struct PathMapper {
    mappings: Vec<PathMapping>,
}

impl PathMapper {
    pub fn new(mappings: Vec<PathMapping>) -> Self {
        Self { mappings }
    }

    /// Longest-`local_prefix`-match substitution; unchanged if nothing matches.
    pub fn to_remote(&self, local_path: &str) -> String {
        let best = self
            .mappings
            .iter()
            .filter(|m| local_path.starts_with(&m.local))
            .max_by_key(|m| m.local.len());

        match best {
            Some(m) => format!("{}{}", m.remote, &local_path[m.local.len()..]),
            None => local_path.to_string(),
        }
    }

    /// Symmetric to [`Self::to_remote`].
    pub fn to_local(&self, remote_path: &str) -> String {
        let best = self
            .mappings
            .iter()
            .filter(|m| remote_path.starts_with(&m.remote))
            .max_by_key(|m| m.remote.len());

        match best {
            Some(m) => format!("{}{}", m.local, &remote_path[m.remote.len()..]),
            None => remote_path.to_string(),
        }
    }
}
