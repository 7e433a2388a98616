use bytes::Bytes;
use futures::future::join_all;
use serde::de::DeserializeOwned;
use shared::{Error, Result};
use std::sync::Arc;

use crate::cache::TtlCache;
use crate::domain::DataType;
use crate::fetch::coordinator::{FailurePolicy, StaticDataFetcher};
use crate::models::{ArmorPenetration, Item, Preset, Price, Quest};
use crate::ports::BlobStore;

/// One [`StaticDataFetcher`] per [`DataType`], all sharing the same cache
/// and blob store.
#[derive(Debug)]
pub struct Fetchers {
    cache: Arc<TtlCache>,
    // Indexed by `DataType as usize`
    fetchers: Vec<StaticDataFetcher>,
}

impl Fetchers {
    pub fn new(
        cache: Arc<TtlCache>,
        blob_store: Arc<dyn BlobStore>,
        failure_policy: FailurePolicy,
    ) -> Self {
        let fetchers = DataType::ALL
            .into_iter()
            .map(|data_type| {
                StaticDataFetcher::new(data_type, Arc::clone(&cache), Arc::clone(&blob_store))
                    .with_failure_policy(failure_policy)
            })
            .collect();

        Self { cache, fetchers }
    }

    pub fn cache(&self) -> &Arc<TtlCache> {
        &self.cache
    }

    pub fn fetcher(&self, data_type: DataType) -> &StaticDataFetcher {
        &self.fetchers[data_type as usize]
    }

    pub async fn fetch(&self, data_type: DataType) -> Result<Bytes> {
        self.fetcher(data_type).fetch().await
    }

    /// Fetch and decode a JSON payload.
    pub async fn fetch_json<T: DeserializeOwned>(&self, data_type: DataType) -> Result<T> {
        let payload = self.fetch(data_type).await?;
        serde_json::from_slice(&payload).map_err(|err| Error::Deserialize {
            data_type: data_type.key(),
            reason: err.to_string(),
        })
    }

    /// Fetch every data type concurrently.
    pub async fn fetch_all(&self) -> Vec<(DataType, Result<Bytes>)> {
        join_all(self.fetchers.iter().map(|fetcher| async move {
            (fetcher.data_type(), fetcher.fetch().await)
        }))
        .await
    }

    pub fn invalidate(&self, data_type: DataType) -> bool {
        self.fetcher(data_type).invalidate()
    }

    pub async fn items(&self) -> Result<Vec<Item>> {
        self.fetch_json(DataType::Items).await
    }

    pub async fn prices(&self) -> Result<Vec<Price>> {
        self.fetch_json(DataType::Prices).await
    }

    pub async fn presets(&self) -> Result<Vec<Preset>> {
        self.fetch_json(DataType::Presets).await
    }

    pub async fn quests(&self) -> Result<Vec<Quest>> {
        self.fetch_json(DataType::Quests).await
    }

    pub async fn armor_penetrations(&self) -> Result<Vec<ArmorPenetration>> {
        self.fetch_json(DataType::ArmorPenetrations).await
    }

    pub async fn item_categories(&self) -> Result<Vec<String>> {
        self.fetch_json(DataType::ItemCategories).await
    }
}
