use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::{Error, Result};

pub enum BlobBackend {
    Fs(String),     // root directory
    Http(String),   // base url of the container
    Memory,
}

pub struct Config {
    pub default_cache_duration: Duration,
    pub price_cache_duration: Duration,
    pub blob: BlobBackend,
    pub blob_timeout: Duration,
    pub serve_stale_on_error: bool,
    pub refresh_interval: Duration,
}

impl Config {
    const DEFAULT_CACHE_DURATION_SECS: u64 = 600;
    const DEFAULT_PRICE_CACHE_DURATION_SECS: u64 = 1800;
    const DEFAULT_BLOB_DIR: &str = "./data";
    const DEFAULT_BLOB_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 300;

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source; `from_env` passes
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secs = |name: &str, default: u64| {
            Duration::from_secs(parse_or(&lookup, name, default))
        };

        let blob = match lookup("GEARBOX_BLOB_BACKEND")
            .unwrap_or_else(|| "fs".to_string())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "fs" => BlobBackend::Fs(
                lookup("GEARBOX_BLOB_DIR").unwrap_or_else(|| Self::DEFAULT_BLOB_DIR.to_string()),
            ),
            "http" => BlobBackend::Http(lookup("GEARBOX_BLOB_URL").ok_or_else(|| {
                Error::Config("GEARBOX_BLOB_URL is required for the http blob backend".into())
            })?),
            "memory" => BlobBackend::Memory,
            other => {
                return Err(Error::Config(format!(
                    "unknown GEARBOX_BLOB_BACKEND '{other}' (expected fs, http or memory)"
                )));
            }
        };

        Ok(Self {
            default_cache_duration: secs(
                "GEARBOX_CACHE_DURATION_SECS",
                Self::DEFAULT_CACHE_DURATION_SECS,
            ),
            price_cache_duration: secs(
                "GEARBOX_PRICE_CACHE_DURATION_SECS",
                Self::DEFAULT_PRICE_CACHE_DURATION_SECS,
            ),
            blob,
            blob_timeout: secs("GEARBOX_BLOB_TIMEOUT_SECS", Self::DEFAULT_BLOB_TIMEOUT_SECS),
            serve_stale_on_error: parse_or(&lookup, "GEARBOX_SERVE_STALE_ON_ERROR", true),
            refresh_interval: secs(
                "GEARBOX_REFRESH_INTERVAL_SECS",
                Self::DEFAULT_REFRESH_INTERVAL_SECS,
            ),
        })
    }
}

impl BlobBackend {
    pub fn name(&self) -> &str {
        match self {
            BlobBackend::Fs(..) => "fs",
            BlobBackend::Http(..) => "http",
            BlobBackend::Memory => "memory",
        }
    }

    pub fn location(&self) -> Option<&str> {
        match self {
            BlobBackend::Fs(location) | BlobBackend::Http(location) => Some(location),
            BlobBackend::Memory => None,
        }
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            warn!("{name}='{raw}' is not valid, using default {default}");
            default
        }),
        None => default,
    }
}
