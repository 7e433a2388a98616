mod fs_store;
mod http_store;
mod memory_store;

pub use fs_store::FsBlobStore;
pub use http_store::HttpBlobStore;
pub use memory_store::MemoryBlobStore;

use gearbox::BlobStore;
use shared::Result;
use shared::config::{BlobBackend, Config};
use std::sync::Arc;

/// Build the blob store selected by the configuration.
pub fn blob_store_from_config(config: &Config) -> Result<Arc<dyn BlobStore>> {
    let store: Arc<dyn BlobStore> = match &config.blob {
        BlobBackend::Fs(root) => Arc::new(FsBlobStore::new(root)),
        BlobBackend::Http(base_url) => Arc::new(HttpBlobStore::new(base_url, config.blob_timeout)?),
        BlobBackend::Memory => Arc::new(MemoryBlobStore::new()),
    };

    tracing::info!(
        "Using {} blob store{}",
        store.name(),
        config
            .blob
            .location()
            .map(|location| format!(" at {location}"))
            .unwrap_or_default()
    );

    Ok(store)
}
