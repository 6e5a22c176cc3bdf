//! In-memory result blobs addressed by revocable object URLs.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use bytes::Bytes;
use engine_logging::{engine_debug, engine_trace};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

impl Blob {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Cloneable handle; every clone sees the same blobs.
#[derive(Debug, Clone)]
pub struct BlobStore {
    origin: String,
    blobs: Arc<RwLock<HashMap<String, Blob>>>,
}

impl Default for BlobStore {
    fn default() -> Self {
        Self::new("local")
    }
}

impl BlobStore {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            blobs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Stores the bytes and returns a fresh `blob:{origin}/{uuid}` URL.
    pub fn create_object_url(
        &self,
        bytes: impl Into<Bytes>,
        content_type: Option<String>,
    ) -> String {
        let url = format!("blob:{}/{}", self.origin, Uuid::new_v4());
        let blob = Blob {
            bytes: bytes.into(),
            content_type,
        };
        engine_trace!("Object URL created {} ({} bytes)", url, blob.len());
        self.blobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.clone(), blob);
        url
    }

    pub fn get(&self, url: &str) -> Option<Blob> {
        self.blobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned()
    }

    /// Frees the blob. Returns `false` when the URL was unknown or already revoked.
    pub fn revoke_object_url(&self, url: &str) -> bool {
        let removed = self
            .blobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(url)
            .is_some();
        engine_debug!("Object URL revoke {} freed={}", url, removed);
        removed
    }

    pub fn live_count(&self) -> usize {
        self.blobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}
