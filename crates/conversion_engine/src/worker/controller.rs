use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use engine_logging::{engine_debug, engine_info, engine_warn};
use url::Url;

use super::{
    AssetNetwork, CacheStorage, CachedResponse, FetchPolicy, FetchRequest, InterceptDecision,
    InterceptMode, WorkerError,
};

pub const DEFAULT_CACHE_NAME: &str = "instantpdf-v2";
pub const DEFAULT_MANIFEST: &[&str] = &["/", "/index.html", "/logo.png", "/manifest.json"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Versioned name. Bumping it is the only way old clients drop stale assets.
    pub cache_name: String,
    pub manifest: Vec<String>,
    pub mode: InterceptMode,
    pub origin: Url,
    pub api_base: Url,
}

impl WorkerConfig {
    pub fn new(origin: Url, api_base: Url) -> Self {
        Self {
            cache_name: DEFAULT_CACHE_NAME.to_string(),
            manifest: DEFAULT_MANIFEST.iter().map(|path| path.to_string()).collect(),
            mode: InterceptMode::default(),
            origin,
            api_base,
        }
    }

    pub fn with_mode(mut self, mode: InterceptMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_cache_name(mut self, cache_name: impl Into<String>) -> Self {
        self.cache_name = cache_name.into();
        self
    }

    pub fn with_manifest<I, S>(mut self, manifest: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.manifest = manifest.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivateReport {
    pub deleted_caches: Vec<String>,
    pub clients_claimed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not intercepted; the caller goes to the network itself.
    Passthrough,
    FromCache(CachedResponse),
    FromNetwork(CachedResponse),
}

pub struct WorkerCacheController {
    config: WorkerConfig,
    policy: FetchPolicy,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn AssetNetwork>,
    state: Mutex<WorkerState>,
    skip_waiting: AtomicBool,
    clients_claimed: AtomicBool,
}

impl WorkerCacheController {
    pub fn new(
        config: WorkerConfig,
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn AssetNetwork>,
    ) -> Self {
        let policy = FetchPolicy::new(config.mode, &config.origin, &config.api_base);
        Self {
            config,
            policy,
            storage,
            network,
            state: Mutex::new(WorkerState::Parsed),
            skip_waiting: AtomicBool::new(false),
            clients_claimed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn skip_waiting(&self) -> bool {
        self.skip_waiting.load(Ordering::Acquire)
    }

    pub fn clients_claimed(&self) -> bool {
        self.clients_claimed.load(Ordering::Acquire)
    }

    pub fn mark_redundant(&self) {
        self.set_state(WorkerState::Redundant);
        self.clients_claimed.store(false, Ordering::Release);
    }

    /// Populates the cache from the manifest. Any failed asset aborts the whole
    /// install before anything is written.
    pub async fn install(&self) -> Result<(), WorkerError> {
        self.transition(WorkerState::Parsed, WorkerState::Installing)?;
        engine_info!(
            "Worker install cache={} mode={}",
            self.config.cache_name,
            self.config.mode
        );

        if self.config.mode == InterceptMode::CacheFirstStatic {
            match self.fetch_manifest().await {
                Ok(entries) => self.storage.put_all(&self.config.cache_name, entries),
                Err(err) => {
                    engine_warn!("Worker install failed: {}", err);
                    self.set_state(WorkerState::Redundant);
                    return Err(err);
                }
            }
        }

        self.skip_waiting.store(true, Ordering::Release);
        self.set_state(WorkerState::Installed);
        Ok(())
    }

    async fn fetch_manifest(&self) -> Result<Vec<(String, CachedResponse)>, WorkerError> {
        let mut entries = Vec::with_capacity(self.config.manifest.len());
        for path in &self.config.manifest {
            let url = self
                .config
                .origin
                .join(path)
                .map_err(|err| WorkerError::InvalidUrl(err.to_string()))?;
            let response = self
                .network
                .get(&url)
                .await
                .map_err(|err| WorkerError::InstallFailed {
                    path: path.clone(),
                    reason: err.to_string(),
                })?;
            if !(200..300).contains(&response.status) {
                return Err(WorkerError::InstallFailed {
                    path: path.clone(),
                    reason: format!("status {}", response.status),
                });
            }
            entries.push((url.path().to_string(), response));
        }
        Ok(entries)
    }

    pub fn activate(&self) -> Result<ActivateReport, WorkerError> {
        self.transition(WorkerState::Installed, WorkerState::Activating)?;

        let purge_all = self.config.mode == InterceptMode::Disabled;
        let deleted_caches: Vec<String> = self
            .storage
            .keys()
            .into_iter()
            .filter(|name| purge_all || *name != self.config.cache_name)
            .filter(|name| self.storage.delete(name))
            .collect();
        if !deleted_caches.is_empty() {
            engine_info!("Worker deleted caches {:?}", deleted_caches);
        }

        self.clients_claimed.store(true, Ordering::Release);
        self.set_state(WorkerState::Activated);
        Ok(ActivateReport {
            deleted_caches,
            clients_claimed: true,
        })
    }

    pub async fn handle_fetch(&self, request: &FetchRequest) -> Result<FetchOutcome, WorkerError> {
        if self.state() != WorkerState::Activated {
            return Ok(FetchOutcome::Passthrough);
        }
        match self.policy.decide(request) {
            InterceptDecision::Bypass(reason) => {
                engine_debug!("Worker bypass {} {} ({:?})", request.method, request.url, reason);
                Ok(FetchOutcome::Passthrough)
            }
            InterceptDecision::CacheFirst => {
                if let Some(hit) = self
                    .storage
                    .match_path(&self.config.cache_name, request.url.path())
                {
                    return Ok(FetchOutcome::FromCache(hit));
                }
                let response = self.network.get(&request.url).await?;
                Ok(FetchOutcome::FromNetwork(response))
            }
        }
    }

    fn transition(&self, from: WorkerState, to: WorkerState) -> Result<(), WorkerError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != from {
            return Err(WorkerError::WrongState(*state, from));
        }
        *state = to;
        Ok(())
    }

    fn set_state(&self, next: WorkerState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }
}
