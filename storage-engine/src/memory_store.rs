use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use gearbox::BlobStore;
use shared::{Error, Result};

/// In-memory blob store, for tests and local runs without storage
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<String, Bytes>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, resource: impl Into<String>, payload: impl Into<Bytes>) {
        self.blobs.insert(resource.into(), payload.into());
    }

    pub fn delete(&self, resource: &str) -> bool {
        self.blobs.remove(resource).is_some()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn fetch(&self, resource: &str) -> Result<Bytes> {
        self.blobs
            .get(resource)
            .map(|blob| blob.value().clone())
            .ok_or_else(|| Error::BlobNotFound(resource.to_string()))
    }

    fn name(&self) -> &str {
        "memory"
    }
}
