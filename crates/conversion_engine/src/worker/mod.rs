//! Offline asset cache worker: install, activate, intercept, unregister.

mod controller;
mod network;
mod policy;
mod registry;
mod storage;

pub use controller::{
    ActivateReport, FetchOutcome, WorkerCacheController, WorkerConfig, WorkerState,
};
pub use network::{AssetNetwork, ReqwestAssetNetwork};
pub use policy::{BypassReason, FetchPolicy, FetchRequest, InterceptDecision, InterceptMode};
pub use registry::{WorkerDeregistrar, WorkerRegistry};
pub use storage::{CacheStorage, CachedResponse, MemoryCacheStorage};

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkerError {
    #[error("failed to cache {path}: {reason}")]
    InstallFailed { path: String, reason: String },
    #[error("invalid worker url: {0}")]
    InvalidUrl(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("worker is {0:?}, expected {1:?}")]
    WrongState(WorkerState, WorkerState),
}
