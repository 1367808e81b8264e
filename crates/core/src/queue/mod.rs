//! Queue: the central persistent entity and its lifecycle rules.
//!
//! Models a multi-stage download pipeline (search -> download -> convert ->
//! place) as a single row per item, split across submodules: types / state
//! machine / store trait / sqlite backend.

pub mod memory_store;
pub mod retry;
pub mod sqlite_store;
pub mod state_machine;
pub mod store;
pub mod types;

pub use memory_store::MemoryQueueStore;
pub use retry::{RetryBudgets, RetryOutcome, RetryPolicy};
pub use sqlite_store::SqliteQueueStore;
pub use store::{QueueStore, QueueStoreError};
pub use types::{
    EnqueueRequest, FailureKind, ItemKind, PreSelectedSource, QueueFilter, QueueItem,
    QueueItemUpdate, Status,
};
