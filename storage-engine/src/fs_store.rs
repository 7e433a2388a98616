use async_trait::async_trait;
use bytes::Bytes;
use gearbox::BlobStore;
use shared::{Error, Result};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Blob store reading `<root>/<resource>` from the local filesystem
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, resource: &str) -> Result<PathBuf> {
        let relative = Path::new(resource);
        let is_plain = !resource.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));

        if !is_plain {
            return Err(Error::blob_fetch(resource, "invalid blob name"));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn fetch(&self, resource: &str) -> Result<Bytes> {
        let path = self.resolve(resource)?;

        match tokio::fs::read(&path).await {
            Ok(content) => Ok(Bytes::from(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(Error::BlobNotFound(resource.to_string()))
            }
            Err(err) => Err(Error::blob_fetch(resource, err)),
        }
    }

    fn name(&self) -> &str {
        "fs"
    }
}
