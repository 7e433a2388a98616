// shared/src/lib.rs

/// Errors surfaced by the cache, the fetch coordinator and the blob stores.
///
/// `Clone` because one in-flight fetch result is handed to every caller
/// waiting on it.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("no cached value for '{0}'")]
    CacheMiss(&'static str),
    #[error("blob not found: {0}")]
    BlobNotFound(String),
    #[error("failed to fetch blob '{resource}': {reason}")]
    BlobFetch { resource: String, reason: String },
    #[error("failed to deserialize '{data_type}': {reason}")]
    Deserialize {
        data_type: &'static str,
        reason: String,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl Error {
    pub fn blob_fetch(resource: impl Into<String>, reason: impl ToString) -> Self {
        Error::BlobFetch {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }

    /// True for failures reported by a blob store adapter.
    pub fn is_blob_failure(&self) -> bool {
        matches!(self, Error::BlobNotFound(_) | Error::BlobFetch { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod config;
