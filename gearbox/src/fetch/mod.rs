pub mod coordinator;
pub mod registry;

pub use coordinator::{FailurePolicy, StaticDataFetcher};
pub use registry::Fetchers;
