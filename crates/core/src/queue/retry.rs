//! Per-failure-kind retry budgets and backoff.
//!
//! Grounded on the original `retry_handler.py`'s `MAX_RETRIES` table and
//! retry-target map, restructured into a configurable struct rather than a
//! hardcoded dict so deployments can tune budgets without a code change.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::types::{FailureKind, Status};

/// Per-failure-kind retry budget and backoff configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryBudgets {
    pub search: u32,
    pub download: u32,
    pub audible_download: u32,
    pub conversion: u32,
    pub import: u32,
    /// Backoff applied only to `DOWNLOAD_FAILED` retries.
    pub retry_backoff_seconds: u32,
}

impl Default for RetryBudgets {
    fn default() -> Self {
        Self {
            search: 3,
            download: 2,
            audible_download: 2,
            conversion: 1,
            import: 2,
            retry_backoff_seconds: 10,
        }
    }
}

impl RetryBudgets {
    fn budget(&self, kind: FailureKind) -> u32 {
        match kind {
            FailureKind::Search => self.search,
            FailureKind::Download => self.download,
            FailureKind::AudibleDownload => self.audible_download,
            FailureKind::Conversion => self.conversion,
            FailureKind::Import => self.import,
        }
    }

    /// Clamp to the documented minimum of 10s, matching `set_retry_backoff`
    /// in the original handler (`minimum = max(10, seconds)`).
    pub fn with_backoff_seconds(mut self, seconds: u32) -> Self {
        self.retry_backoff_seconds = seconds.max(10);
        self
    }
}

/// Target state a retryable failure resolves to, plus whether it is retried
/// at all, encoded so the orchestrator never has to special-case a kind.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome {
    /// Item should move to `target` with `retry_count` incremented, eligible
    /// at `next_retry_at` (immediately, unless the kind carries a backoff).
    Retry {
        target: Status,
        retry_count: i32,
        next_retry_at: Option<DateTime<Utc>>,
    },
    /// Budget exhausted: write the item into its terminal `*_FAILED` state.
    Permanent { failed_status: Status },
}

/// Stateless policy evaluator; takes the current `retry_count` from the item
/// and the budgets configuration, and returns what the caller should write.
/// Never mutates anything itself — matches the rest of this crate's
/// convention of adapters/policies returning values that the Orchestrator
/// alone writes through the QueueStore.
pub struct RetryPolicy {
    budgets: RetryBudgets,
}

impl RetryPolicy {
    pub fn new(budgets: RetryBudgets) -> Self {
        Self { budgets }
    }

    fn retry_target(kind: FailureKind) -> Status {
        match kind {
            FailureKind::Search => Status::Searching,
            FailureKind::Download => Status::Found,
            FailureKind::AudibleDownload => Status::Queued,
            FailureKind::Conversion => Status::Converting,
            FailureKind::Import => Status::Importing,
        }
    }

    /// `handle_failure`: increments `retry_count` and returns the
    /// retry target if under budget, otherwise a permanent failure outcome.
    pub fn handle_failure(&self, kind: FailureKind, current_retry_count: i32) -> RetryOutcome {
        let budget = self.budgets.budget(kind) as i32;
        if current_retry_count < budget {
            let next_retry_at = if kind == FailureKind::Download {
                Some(Utc::now() + Duration::seconds(self.budgets.retry_backoff_seconds as i64))
            } else {
                None
            };
            RetryOutcome::Retry {
                target: Self::retry_target(kind),
                retry_count: current_retry_count + 1,
                next_retry_at,
            }
        } else {
            RetryOutcome::Permanent {
                failed_status: kind.failed_status(),
            }
        }
    }
}

/// map[failure_kind] -> current retry_count, convenience for reporting /
/// administrative surfaces that want a snapshot of retry state.
pub type RetryCounts = HashMap<FailureKind, i32>;
