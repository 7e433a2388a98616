use async_trait::async_trait;
use bytes::Bytes;
use gearbox::BlobStore;
use reqwest::{Client, StatusCode};
use shared::{Error, Result};
use std::time::Duration;
use tracing::debug;

/// Blob store reading `GET <base_url>/<resource>` from a storage container.
///
/// The base url may carry a query string (e.g. a shared access signature);
/// it is appended after the blob name.
#[derive(Debug, Clone)]
pub struct HttpBlobStore {
    client: Client,
    base_url: String,
    query: Option<String>,
}

impl HttpBlobStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| Error::Config(format!("failed to build HTTP client: {err}")))?;

        let (base_url, query) = match base_url.split_once('?') {
            Some((base, query)) => (base, Some(query.to_string())),
            None => (base_url, None),
        };

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            query,
        })
    }

    pub fn blob_url(&self, resource: &str) -> String {
        match &self.query {
            Some(query) => format!("{}/{}?{}", self.base_url, resource, query),
            None => format!("{}/{}", self.base_url, resource),
        }
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn fetch(&self, resource: &str) -> Result<Bytes> {
        debug!("GET {}/{}", self.base_url, resource);

        let response = self
            .client
            .get(self.blob_url(resource))
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    Error::blob_fetch(resource, "request timed out")
                } else {
                    Error::blob_fetch(resource, err)
                }
            })?;

        match response.status() {
            status if status.is_success() => response
                .bytes()
                .await
                .map_err(|err| Error::blob_fetch(resource, err)),
            StatusCode::NOT_FOUND => Err(Error::BlobNotFound(resource.to_string())),
            status => Err(Error::blob_fetch(resource, format!("HTTP {status}"))),
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}
