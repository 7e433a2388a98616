use bytes::Bytes;
use chrono::{DateTime, Utc};
use shared::config::Config;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::Instant;

/// Category of static data served to the website. Each one is a single
/// pre-generated JSON blob.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataType {
    Changelog,
    ItemCategories,
    ItemMissingProperties,
    Items,
    Presets,
    Prices,
    Quests,
    ArmorPenetrations,
    TarkovValues,
    WebsiteConfiguration,
}

impl DataType {
    pub const ALL: [DataType; 10] = [
        DataType::Changelog,
        DataType::ItemCategories,
        DataType::ItemMissingProperties,
        DataType::Items,
        DataType::Presets,
        DataType::Prices,
        DataType::Quests,
        DataType::ArmorPenetrations,
        DataType::TarkovValues,
        DataType::WebsiteConfiguration,
    ];

    pub fn key(self) -> &'static str {
        match self {
            DataType::Changelog => "changelog",
            DataType::ItemCategories => "item_categories",
            DataType::ItemMissingProperties => "item_missing_properties",
            DataType::Items => "items",
            DataType::Presets => "presets",
            DataType::Prices => "prices",
            DataType::Quests => "quests",
            DataType::ArmorPenetrations => "armor_penetrations",
            DataType::TarkovValues => "tarkov_values",
            DataType::WebsiteConfiguration => "website_configuration",
        }
    }

    /// Name of the blob holding this data type.
    pub fn resource_name(self) -> &'static str {
        match self {
            DataType::Changelog => "changelog.json",
            DataType::ItemCategories => "item-categories.json",
            DataType::ItemMissingProperties => "item-missing-properties.json",
            DataType::Items => "items.json",
            DataType::Presets => "presets.json",
            DataType::Prices => "prices.json",
            DataType::Quests => "quests.json",
            DataType::ArmorPenetrations => "armor-penetrations.json",
            DataType::TarkovValues => "tarkov-values.json",
            DataType::WebsiteConfiguration => "website-configuration.json",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for DataType {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        DataType::ALL
            .into_iter()
            .find(|data_type| data_type.key() == normalized)
            .ok_or("Invalid data type value")
    }
}

/// Validity windows of cached data. Prices change more often than the rest
/// of the data and get their own window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheDurations {
    pub default: Duration,
    pub prices: Duration,
}

impl CacheDurations {
    pub fn new(default: Duration, prices: Duration) -> Self {
        Self { default, prices }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.default_cache_duration, config.price_cache_duration)
    }

    pub fn ttl_for(&self, data_type: DataType) -> Duration {
        match data_type {
            DataType::Prices => self.prices,
            _ => self.default,
        }
    }
}

/// Last payload stored for a data type.
///
/// `stored_at` drives validity and follows tokio's clock; `stored_at_utc`
/// is only used for reporting.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub payload: Bytes,
    pub stored_at: Instant,
    pub stored_at_utc: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(payload: Bytes) -> Self {
        Self {
            payload,
            stored_at: Instant::now(),
            stored_at_utc: Utc::now(),
        }
    }

    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.stored_at)
    }

    pub fn is_valid(&self, ttl: Duration) -> bool {
        self.age() <= ttl
    }
}

#[derive(Clone, Debug)]
pub struct CacheEntryInfo {
    pub data_type: DataType,
    pub size_bytes: usize,
    pub age: Duration,
    pub stored_at: DateTime<Utc>,
    pub valid: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_parse() {
        assert_eq!("items".parse::<DataType>(), Ok(DataType::Items));
        assert_eq!("Item-Categories".parse::<DataType>(), Ok(DataType::ItemCategories));
        assert!("weapons".parse::<DataType>().is_err());

        for data_type in DataType::ALL {
            assert_eq!(data_type.to_string().parse::<DataType>(), Ok(data_type));
        }
    }

    #[test]
    fn test_resource_names_are_distinct() {
        let mut names: Vec<_> = DataType::ALL.iter().map(|d| d.resource_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), DataType::ALL.len());
    }

    #[test]
    fn test_prices_use_their_own_ttl() {
        let durations = CacheDurations::new(Duration::from_secs(10), Duration::from_secs(120));

        assert_eq!(durations.ttl_for(DataType::Prices), Duration::from_secs(120));
        assert_eq!(durations.ttl_for(DataType::Items), Duration::from_secs(10));
        assert_eq!(durations.ttl_for(DataType::Presets), Duration::from_secs(10));
    }
}
