//! Queue orchestrator for automated pipeline processing.
//!
//! Drives queue items through the state machine automatically on a single
//! monitor-loop task: `process_queue` advances QUEUED/FOUND items,
//! `monitor_downloads` polls in-flight downloads, `process_pipeline`
//! advances COMPLETE/CONVERTED/IMPORTING/SEEDING items. The catalog worker
//! pool runs independently on its own semaphore-bounded tasks; the monitor
//! loop only reads its buffered progress/results on each tick.

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::Orchestrator;
pub use types::{OrchestratorError, OrchestratorStatus};
