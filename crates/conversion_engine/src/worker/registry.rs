use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use engine_logging::{engine_info, engine_warn};

use super::{ActivateReport, WorkerCacheController, WorkerError, WorkerState};

/// Best-effort removal of every registered worker.
#[async_trait]
pub trait WorkerDeregistrar: Send + Sync {
    /// Returns how many registrations were removed.
    async fn unregister_all(&self) -> usize;
}

/// Process-wide list of worker registrations, newest last.
#[derive(Default)]
pub struct WorkerRegistry {
    registrations: Mutex<Vec<Arc<WorkerCacheController>>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs and activates `controller`. On success it supersedes every
    /// earlier registration.
    pub async fn register(
        &self,
        controller: WorkerCacheController,
    ) -> Result<ActivateReport, WorkerError> {
        let controller = Arc::new(controller);
        controller.install().await?;
        let report = controller.activate()?;

        let mut registrations = self
            .registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for previous in registrations.drain(..) {
            previous.mark_redundant();
        }
        registrations.push(controller);
        engine_info!(
            "Worker registered; deleted {} old cache(s)",
            report.deleted_caches.len()
        );
        Ok(report)
    }

    pub fn registrations(&self) -> Vec<Arc<WorkerCacheController>> {
        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The controller currently governing fetches, if any.
    pub fn active(&self) -> Option<Arc<WorkerCacheController>> {
        self.registrations()
            .into_iter()
            .rev()
            .find(|controller| controller.state() == WorkerState::Activated)
    }

    pub fn unregister_all_now(&self) -> usize {
        let removed: Vec<_> = self
            .registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for controller in &removed {
            controller.mark_redundant();
        }
        if !removed.is_empty() {
            engine_warn!("Unregistered {} worker(s)", removed.len());
        }
        removed.len()
    }
}

#[async_trait]
impl WorkerDeregistrar for WorkerRegistry {
    async fn unregister_all(&self) -> usize {
        self.unregister_all_now()
    }
}
