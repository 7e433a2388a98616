//! In-memory cache of static data blobs, one entry per [`DataType`].
//!
//! Having a value and having a *valid* value are two separate questions:
//! entries are never evicted on expiry, so an expired payload stays readable
//! through [`TtlCache::get`] and can be served when a refresh fails.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use shared::{Error, Result};
use std::time::Duration;
use tracing::{debug, error};

use crate::domain::{CacheDurations, CacheEntry, CacheEntryInfo, DataType};

#[derive(Debug)]
pub struct TtlCache {
    entries: DashMap<DataType, CacheEntry>,
    durations: CacheDurations,
}

impl TtlCache {
    pub fn new(durations: CacheDurations) -> Self {
        Self {
            entries: DashMap::new(),
            durations,
        }
    }

    /// Validity window applied to `data_type`.
    pub fn ttl(&self, data_type: DataType) -> Duration {
        self.durations.ttl_for(data_type)
    }

    /// Latest payload stored for `data_type`, fresh or not.
    pub fn get(&self, data_type: DataType) -> Result<Bytes> {
        match self.entries.get(&data_type) {
            Some(entry) => Ok(entry.payload.clone()),
            None => {
                error!("No cached value for '{}'", data_type);
                Err(Error::CacheMiss(data_type.key()))
            }
        }
    }

    /// Like [`TtlCache::get`] but silent on a miss, for fallback lookups.
    pub fn get_stale(&self, data_type: DataType) -> Option<Bytes> {
        self.entries
            .get(&data_type)
            .map(|entry| entry.payload.clone())
    }

    pub fn has_valid_cache(&self, data_type: DataType) -> bool {
        self.get_valid(data_type).is_some()
    }

    /// Payload for `data_type` if it is still inside its validity window.
    /// Validity and value come from the same entry read.
    pub fn get_valid(&self, data_type: DataType) -> Option<Bytes> {
        let ttl = self.ttl(data_type);
        self.entries
            .get(&data_type)
            .filter(|entry| entry.is_valid(ttl))
            .map(|entry| entry.payload.clone())
    }

    /// Replace the payload for `data_type`.
    ///
    /// With `update_stored_at == false` the previous timestamp is kept, so the
    /// entry expires when the old one would have. A first store always records
    /// the current time.
    pub fn store(&self, data_type: DataType, payload: impl Into<Bytes>, update_stored_at: bool) {
        let payload = payload.into();
        let size = payload.len();

        match self.entries.entry(data_type) {
            Entry::Occupied(mut occupied) if !update_stored_at => {
                occupied.get_mut().payload = payload;
            }
            Entry::Occupied(mut occupied) => {
                occupied.insert(CacheEntry::new(payload));
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CacheEntry::new(payload));
            }
        }

        debug!(
            "Stored {} bytes for '{}' (timestamp updated: {})",
            size, data_type, update_stored_at
        );
    }

    /// Drop the entry for `data_type`. Returns whether one existed.
    pub fn remove(&self, data_type: DataType) -> bool {
        let removed = self.entries.remove(&data_type).is_some();
        if removed {
            debug!("Removed cached value for '{}'", data_type);
        }
        removed
    }

    /// Wall-clock time of the last timestamped store.
    pub fn stored_at(&self, data_type: DataType) -> Option<DateTime<Utc>> {
        self.entries.get(&data_type).map(|entry| entry.stored_at_utc)
    }

    pub fn snapshot(&self) -> Vec<CacheEntryInfo> {
        let mut infos: Vec<CacheEntryInfo> = self
            .entries
            .iter()
            .map(|entry| {
                let data_type = *entry.key();
                CacheEntryInfo {
                    data_type,
                    size_bytes: entry.payload.len(),
                    age: entry.age(),
                    stored_at: entry.stored_at_utc,
                    valid: entry.is_valid(self.ttl(data_type)),
                }
            })
            .collect();
        infos.sort_by_key(|info| info.data_type);
        infos
    }
}
