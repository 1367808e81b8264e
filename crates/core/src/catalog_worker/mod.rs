//! Bounded in-process worker pool for DRM-protected catalog downloads.

pub mod pool;
pub mod traits;
pub mod types;

pub use pool::{CatalogWorkerPool, PoolStats, PoolStatus, ProgressSnapshot};
pub use traits::{CatalogDownloadWorker, CatalogOwnership};
pub use types::{
    CancelToken, CatalogDownloadOutcome, CatalogDownloadRequest, CatalogWorkerError, FormatPref,
    ProgressCb,
};
