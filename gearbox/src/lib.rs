pub mod cache;
pub mod domain;
pub mod fetch;
pub mod models;
pub mod ports;

pub use cache::TtlCache;
pub use domain::{CacheDurations, DataType};
pub use fetch::{FailurePolicy, Fetchers, StaticDataFetcher};
pub use ports::BlobStore;
