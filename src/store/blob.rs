use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use super::StoreError;

/// Reference to an uploaded blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobHandle {
    pub path: String,
}

/// Binary object storage for product images.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<BlobHandle, StoreError>;

    async fn download_url(&self, handle: &BlobHandle) -> Result<String, StoreError>;
}

#[derive(Debug, Clone)]
struct StoredBlob {
    bytes: Vec<u8>,
    content_type: String,
}

#[derive(Debug)]
pub struct InMemoryBlobStore {
    base_url: String,
    blobs: DashMap<String, StoredBlob>,
    offline: AtomicBool,
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new("memory://blobs")
    }
}

impl InMemoryBlobStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            blobs: DashMap::new(),
            offline: AtomicBool::new(false),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    pub fn content_type(&self, path: &str) -> Option<String> {
        self.blobs.get(path).map(|b| b.content_type.clone())
    }

    pub fn bytes(&self, path: &str) -> Option<Vec<u8>> {
        self.blobs.get(path).map(|b| b.bytes.clone())
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<BlobHandle, StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("blob store is offline".into()));
        }
        if bytes.is_empty() {
            return Err(StoreError::Rejected(format!("empty upload for {}", path)));
        }
        self.blobs.insert(
            path.to_string(),
            StoredBlob {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(BlobHandle {
            path: path.to_string(),
        })
    }

    async fn download_url(&self, handle: &BlobHandle) -> Result<String, StoreError> {
        if !self.blobs.contains_key(&handle.path) {
            return Err(StoreError::not_found("blobs", &handle.path));
        }
        Ok(format!("{}/{}", self.base_url.trim_end_matches('/'), handle.path))
    }
}
