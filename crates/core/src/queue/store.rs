//! The `QueueStore` trait: persistence contract for queue items.
//!
//! A synchronous trait (sqlite calls are blocking; the orchestrator calls
//! through `tokio::task::spawn_blocking` or simply pays the cost inline on
//! its own loop tick) with one error enum shared by every backend.

use thiserror::Error;

use super::types::{EnqueueRequest, QueueFilter, QueueItem, QueueItemUpdate, Status};

#[derive(Debug, Error)]
pub enum QueueStoreError {
    #[error("queue item {0} not found")]
    NotFound(i64),

    #[error("catalog_id {0} already has an active queue item")]
    DuplicateActiveCatalogId(String),

    #[error("invalid transition {from:?} -> {to:?} for item {id}")]
    InvalidTransition { id: i64, from: Status, to: Status },

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, QueueStoreError>;

/// CRUD + lifecycle contract for the queue.
///
/// Implementations must enforce I1 (at most one active item per
/// `catalog_id`) on `enqueue`, and must reject transitions that
/// [`crate::queue::state_machine::is_valid_transition`] rejects when
/// `update` carries a `status` change.
pub trait QueueStore: Send + Sync {
    fn enqueue(&self, request: EnqueueRequest) -> Result<QueueItem>;

    fn get(&self, id: i64) -> Result<QueueItem>;

    fn get_by_catalog_id(&self, catalog_id: &str) -> Result<Option<QueueItem>>;

    fn list(&self, filter: QueueFilter) -> Result<Vec<QueueItem>>;

    /// Applies `update` to the item, validating any `status` change against
    /// the state machine and stamping `started_at`/`completed_at` as
    /// dictated by [`crate::queue::state_machine`]. Always bumps
    /// `updated_at`.
    fn update(&self, id: i64, update: QueueItemUpdate) -> Result<QueueItem>;

    /// Administrative hard delete. The only deletion path this store
    /// exposes — there is deliberately no bulk "clear" operation.
    fn delete(&self, id: i64) -> Result<()>;

    /// Items whose `next_retry_at` has elapsed and are eligible for the
    /// orchestrator to re-drive.
    fn due_for_retry(&self) -> Result<Vec<QueueItem>>;

    /// Count of items grouped by status, for observability/metrics.
    fn statistics(&self) -> Result<Vec<(Status, i64)>>;
}
