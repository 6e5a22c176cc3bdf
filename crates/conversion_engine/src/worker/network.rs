use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use url::Url;

use super::{CachedResponse, WorkerError};

/// Network access used by the worker for manifest population and cache misses.
#[async_trait]
pub trait AssetNetwork: Send + Sync {
    async fn get(&self, url: &Url) -> Result<CachedResponse, WorkerError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestAssetNetwork {
    client: reqwest::Client,
}

impl ReqwestAssetNetwork {
    pub fn new() -> Result<Self, WorkerError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| WorkerError::Network(err.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AssetNetwork for ReqwestAssetNetwork {
    async fn get(&self, url: &Url) -> Result<CachedResponse, WorkerError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| WorkerError::Network(err.to_string()))?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        let body = response
            .bytes()
            .await
            .map_err(|err| WorkerError::Network(err.to_string()))?;
        Ok(CachedResponse {
            status,
            content_type,
            body,
        })
    }
}
