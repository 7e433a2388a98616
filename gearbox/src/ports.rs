#![deny(clippy::all)]

use async_trait::async_trait;
use bytes::Bytes;
use shared::Result;

// Ports are the pluggable extension points for where static data is read from

/// Port for reading raw blobs by name (local directory, HTTP container, ...)
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Fetch the full content of a blob.
    /// Missing blobs fail with `Error::BlobNotFound`, anything else with `Error::BlobFetch`.
    async fn fetch(&self, resource: &str) -> Result<Bytes>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}
