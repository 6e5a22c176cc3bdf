use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use conversion_engine::worker::{
    AssetNetwork, CacheStorage, CachedResponse, FetchOutcome, FetchRequest, InterceptMode,
    MemoryCacheStorage, ReqwestAssetNetwork, WorkerCacheController, WorkerConfig,
    WorkerDeregistrar, WorkerError, WorkerRegistry, WorkerState,
};
use pretty_assertions::assert_eq;
use reqwest::Method;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serves every path except the ones listed as missing; records requests.
#[derive(Default)]
struct FakeNetwork {
    missing: HashSet<String>,
    requested: Mutex<Vec<String>>,
}

impl FakeNetwork {
    fn failing_on(path: &str) -> Self {
        Self {
            missing: HashSet::from([path.to_string()]),
            ..Self::default()
        }
    }

    fn requests(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetNetwork for FakeNetwork {
    async fn get(&self, url: &Url) -> Result<CachedResponse, WorkerError> {
        self.requested.lock().unwrap().push(url.path().to_string());
        if self.missing.contains(url.path()) {
            return Ok(CachedResponse {
                status: 404,
                content_type: None,
                body: Bytes::new(),
            });
        }
        Ok(CachedResponse {
            status: 200,
            content_type: Some("text/html".to_string()),
            body: Bytes::from(format!("network {}", url.path())),
        })
    }
}

fn config(mode: InterceptMode) -> WorkerConfig {
    WorkerConfig::new(
        Url::parse("https://app.example.com").unwrap(),
        Url::parse("https://api.example.com").unwrap(),
    )
    .with_mode(mode)
}

fn app_url(path: &str) -> Url {
    Url::parse("https://app.example.com").unwrap().join(path).unwrap()
}

async fn activated(
    mode: InterceptMode,
    storage: Arc<MemoryCacheStorage>,
    network: Arc<FakeNetwork>,
) -> WorkerCacheController {
    let controller = WorkerCacheController::new(config(mode), storage, network);
    controller.install().await.expect("install");
    controller.activate().expect("activate");
    controller
}

#[tokio::test]
async fn install_caches_manifest_and_activate_purges_old_versions() {
    let storage = Arc::new(MemoryCacheStorage::new());
    storage.put_all("instantpdf-v1", vec![("/".to_string(), CachedResponse {
        status: 200,
        content_type: None,
        body: Bytes::from_static(b"old"),
    })]);
    let network = Arc::new(FakeNetwork::default());

    let controller = WorkerCacheController::new(
        config(InterceptMode::CacheFirstStatic),
        storage.clone(),
        network.clone(),
    );
    assert_eq!(controller.state(), WorkerState::Parsed);
    controller.install().await.unwrap();
    assert_eq!(controller.state(), WorkerState::Installed);
    assert!(controller.skip_waiting());
    assert_eq!(storage.entry_count("instantpdf-v2"), 4);

    let report = controller.activate().unwrap();
    assert_eq!(report.deleted_caches, vec!["instantpdf-v1".to_string()]);
    assert!(report.clients_claimed);
    assert_eq!(controller.state(), WorkerState::Activated);
    assert_eq!(storage.keys(), vec!["instantpdf-v2".to_string()]);
}

#[tokio::test]
async fn custom_manifest_replaces_app_shell() {
    let storage = Arc::new(MemoryCacheStorage::new());
    let network = Arc::new(FakeNetwork::default());
    let controller = WorkerCacheController::new(
        config(InterceptMode::CacheFirstStatic).with_manifest(["/app.js", "/style.css"]),
        storage.clone(),
        network.clone(),
    );

    controller.install().await.unwrap();
    assert_eq!(
        network.requests(),
        vec!["/app.js".to_string(), "/style.css".to_string()]
    );
    assert_eq!(storage.entry_count("instantpdf-v2"), 2);
    assert_eq!(controller.config().manifest.len(), 2);
}

#[tokio::test]
async fn install_is_all_or_nothing() {
    let storage = Arc::new(MemoryCacheStorage::new());
    let network = Arc::new(FakeNetwork::failing_on("/logo.png"));
    let controller = WorkerCacheController::new(
        config(InterceptMode::CacheFirstStatic),
        storage.clone(),
        network,
    );

    let err = controller.install().await.unwrap_err();
    assert_eq!(
        err,
        WorkerError::InstallFailed {
            path: "/logo.png".to_string(),
            reason: "status 404".to_string(),
        }
    );
    assert_eq!(controller.state(), WorkerState::Redundant);
    assert!(storage.keys().is_empty());
    assert!(controller.activate().is_err());
}

#[tokio::test]
async fn non_get_and_api_requests_are_never_intercepted() {
    let storage = Arc::new(MemoryCacheStorage::new());
    let network = Arc::new(FakeNetwork::default());
    let controller = activated(InterceptMode::CacheFirstStatic, storage, network.clone()).await;
    let before = network.requests().len();

    let post = FetchRequest::new(Method::POST, app_url("/"));
    assert_eq!(controller.handle_fetch(&post).await.unwrap(), FetchOutcome::Passthrough);

    let api_post = FetchRequest::new(
        Method::POST,
        Url::parse("https://api.example.com/convert/docx?t=1").unwrap(),
    );
    assert_eq!(controller.handle_fetch(&api_post).await.unwrap(), FetchOutcome::Passthrough);

    let api_get = FetchRequest::get(Url::parse("https://api.example.com/health").unwrap());
    assert_eq!(controller.handle_fetch(&api_get).await.unwrap(), FetchOutcome::Passthrough);

    assert_eq!(network.requests().len(), before);
}

#[tokio::test]
async fn same_origin_get_is_cache_first_without_recaching() {
    let storage = Arc::new(MemoryCacheStorage::new());
    let network = Arc::new(FakeNetwork::default());
    let controller =
        activated(InterceptMode::CacheFirstStatic, storage.clone(), network.clone()).await;

    match controller.handle_fetch(&FetchRequest::get(app_url("/logo.png"))).await.unwrap() {
        FetchOutcome::FromCache(response) => {
            assert_eq!(response.body, Bytes::from("network /logo.png"))
        }
        other => panic!("expected cache hit, got {other:?}"),
    }

    let miss = FetchRequest::get(app_url("/assets/app.js"));
    match controller.handle_fetch(&miss).await.unwrap() {
        FetchOutcome::FromNetwork(response) => assert_eq!(response.status, 200),
        other => panic!("expected network fallback, got {other:?}"),
    }
    assert_eq!(storage.entry_count("instantpdf-v2"), 4);
    assert!(storage.match_path("instantpdf-v2", "/assets/app.js").is_none());
}

#[tokio::test]
async fn disabled_mode_purges_every_cache_and_intercepts_nothing() {
    let storage = Arc::new(MemoryCacheStorage::new());
    for name in ["instantpdf-v1", "instantpdf-v2"] {
        storage.put_all(name, Vec::new());
    }
    let network = Arc::new(FakeNetwork::default());
    let controller = WorkerCacheController::new(
        config(InterceptMode::Disabled),
        storage.clone(),
        network.clone(),
    );
    controller.install().await.unwrap();
    assert!(network.requests().is_empty());

    let report = controller.activate().unwrap();
    assert_eq!(report.deleted_caches.len(), 2);
    assert!(storage.keys().is_empty());

    let get = FetchRequest::get(app_url("/"));
    assert_eq!(controller.handle_fetch(&get).await.unwrap(), FetchOutcome::Passthrough);
}

#[tokio::test]
async fn controller_that_is_not_activated_passes_through() {
    let controller = WorkerCacheController::new(
        config(InterceptMode::CacheFirstStatic),
        Arc::new(MemoryCacheStorage::new()),
        Arc::new(FakeNetwork::default()),
    );
    let get = FetchRequest::get(app_url("/"));
    assert_eq!(controller.handle_fetch(&get).await.unwrap(), FetchOutcome::Passthrough);
}

#[tokio::test]
async fn registry_supersedes_and_unregisters() {
    let storage = Arc::new(MemoryCacheStorage::new());
    let network = Arc::new(FakeNetwork::default());
    let registry = WorkerRegistry::new();

    let first = WorkerCacheController::new(
        config(InterceptMode::CacheFirstStatic).with_cache_name("instantpdf-v1"),
        storage.clone(),
        network.clone(),
    );
    registry.register(first).await.unwrap();
    let first = registry.active().unwrap();

    let second = WorkerCacheController::new(
        config(InterceptMode::CacheFirstStatic),
        storage.clone(),
        network.clone(),
    );
    let report = registry.register(second).await.unwrap();
    assert_eq!(report.deleted_caches, vec!["instantpdf-v1".to_string()]);
    assert_eq!(first.state(), WorkerState::Redundant);
    assert_eq!(registry.registrations().len(), 1);

    let active = registry.active().unwrap();
    assert_eq!(registry.unregister_all().await, 1);
    assert_eq!(active.state(), WorkerState::Redundant);
    assert!(registry.registrations().is_empty());
    assert_eq!(registry.unregister_all().await, 0);
}

#[tokio::test]
async fn failed_registration_leaves_registry_untouched() {
    let registry = WorkerRegistry::new();
    let controller = WorkerCacheController::new(
        config(InterceptMode::CacheFirstStatic),
        Arc::new(MemoryCacheStorage::new()),
        Arc::new(FakeNetwork::failing_on("/manifest.json")),
    );
    assert!(registry.register(controller).await.is_err());
    assert!(registry.registrations().is_empty());
}

#[tokio::test]
async fn reqwest_network_populates_cache_from_a_live_origin() {
    let server = MockServer::start().await;
    for asset in ["/", "/index.html", "/logo.png", "/manifest.json"] {
        Mock::given(method("GET"))
            .and(path(asset))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!("asset {asset}")))
            .mount(&server)
            .await;
    }

    let origin = Url::parse(&server.uri()).unwrap();
    let config = WorkerConfig::new(origin.clone(), Url::parse("https://api.example.com").unwrap());
    let storage = Arc::new(MemoryCacheStorage::new());
    let controller = WorkerCacheController::new(
        config,
        storage.clone(),
        Arc::new(ReqwestAssetNetwork::new().unwrap()),
    );
    controller.install().await.unwrap();
    controller.activate().unwrap();

    let hit = controller
        .handle_fetch(&FetchRequest::get(origin.join("/index.html").unwrap()))
        .await
        .unwrap();
    match hit {
        FetchOutcome::FromCache(response) => {
            assert_eq!(response.body, Bytes::from("asset /index.html"))
        }
        other => panic!("expected cache hit, got {other:?}"),
    }
}
