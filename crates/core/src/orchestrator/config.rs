//! The orchestrator's view of its own configuration.
//!
//! `OrchestratorSettings` (in [`crate::config`]) is the TOML/env-deserializable
//! struct a deployment actually writes; this module just re-exports it under
//! the name the orchestrator constructor expects, so the two are never two
//! structs drifting out of sync. See DESIGN.md for why this collapsed what
//! used to be a second, orchestrator-local config type with its own
//! `RetryConfig`.

pub use crate::config::OrchestratorSettings as OrchestratorConfig;
