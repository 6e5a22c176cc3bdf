use std::env;

use engine_logging::{engine_info, engine_warn};
use url::Url;

/// Environment variable that overrides the API base URL.
pub const API_URL_ENV: &str = "CONVERTER_API_URL";

/// Production API used when no override is configured.
pub const DEFAULT_API_BASE: &str = "https://instantpdf-production.up.railway.app";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    api_base: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::with_base(DEFAULT_API_BASE)
    }
}

impl ApiConfig {
    pub fn with_base(api_base: impl Into<String>) -> Self {
        let api_base = api_base.into().trim().trim_end_matches('/').to_string();
        Self { api_base }
    }

    /// Reads `CONVERTER_API_URL`, falling back to the production URL.
    pub fn from_env() -> Self {
        match env::var(API_URL_ENV) {
            Ok(value) if !value.trim().is_empty() => {
                engine_info!("{API_URL_ENV} set, using API base {value}");
                Self::with_base(value)
            }
            Ok(_) => {
                engine_warn!("{API_URL_ENV} is empty, using default {DEFAULT_API_BASE}");
                Self::default()
            }
            Err(_) => Self::default(),
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// `{api_base}{endpoint}`, with an optional `?t=` cache-bust token.
    pub fn endpoint_url(
        &self,
        endpoint: &str,
        cache_bust: Option<&str>,
    ) -> Result<Url, url::ParseError> {
        let path = if endpoint.starts_with('/') {
            endpoint.to_string()
        } else {
            format!("/{endpoint}")
        };
        let mut url = Url::parse(&format!("{}{}", self.api_base, path))?;
        if let Some(token) = cache_bust {
            url.query_pairs_mut().append_pair("t", token);
        }
        Ok(url)
    }

    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.api_base)
    }
}
