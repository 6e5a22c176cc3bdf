//! Which requests the cache worker is allowed to touch.

use std::fmt;
use std::str::FromStr;

use reqwest::Method;
use url::{Origin, Url};

/// Deploy-time interception mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterceptMode {
    /// Serve manifest assets cache-first; everything else goes to the network.
    #[default]
    CacheFirstStatic,
    /// No fetch handling. The worker only purges old caches.
    Disabled,
}

impl FromStr for InterceptMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "cache-first-static" | "cache-first" => Ok(InterceptMode::CacheFirstStatic),
            "disabled" | "off" => Ok(InterceptMode::Disabled),
            other => Err(format!("unknown worker mode: {other}")),
        }
    }
}

impl fmt::Display for InterceptMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterceptMode::CacheFirstStatic => f.write_str("cache-first-static"),
            InterceptMode::Disabled => f.write_str("disabled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
}

impl FetchRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassReason {
    UnsafeMethod,
    ApiOrigin,
    CrossOrigin,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptDecision {
    Bypass(BypassReason),
    CacheFirst,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPolicy {
    mode: InterceptMode,
    origin: Origin,
    api_origin: Origin,
}

impl FetchPolicy {
    pub fn new(mode: InterceptMode, origin: &Url, api_base: &Url) -> Self {
        Self {
            mode,
            origin: origin.origin(),
            api_origin: api_base.origin(),
        }
    }

    /// Non-GET requests and API traffic are never intercepted, in any mode.
    pub fn decide(&self, request: &FetchRequest) -> InterceptDecision {
        if request.method != Method::GET {
            return InterceptDecision::Bypass(BypassReason::UnsafeMethod);
        }
        let origin = request.url.origin();
        if origin == self.api_origin {
            return InterceptDecision::Bypass(BypassReason::ApiOrigin);
        }
        if self.mode == InterceptMode::Disabled {
            return InterceptDecision::Bypass(BypassReason::Disabled);
        }
        if origin != self.origin {
            return InterceptDecision::Bypass(BypassReason::CrossOrigin);
        }
        InterceptDecision::CacheFirst
    }
}
