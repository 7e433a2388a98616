use gearbox::{CacheDurations, DataType, FailurePolicy, Fetchers, TtlCache};
use shared::config::Config;
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables first so RUST_LOG from .env reaches the filter
    let dotenv = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting Gearbox static data service");

    match dotenv {
        Ok(_) => info!("Loaded environment variables from .env file"),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    let config = Config::from_env()?;
    let run_once = std::env::args().any(|arg| arg == "--once");

    // ============================================
    // STEP 1: Cache and blob store
    // ============================================
    let durations = CacheDurations::from_config(&config);
    info!(
        "Cache durations: default {}s, prices {}s",
        durations.default.as_secs(),
        durations.prices.as_secs()
    );

    let cache = Arc::new(TtlCache::new(durations));
    let blob_store = storage_engine::blob_store_from_config(&config)?;
    let fetchers = Fetchers::new(cache, blob_store, FailurePolicy::from_config(&config));

    // ============================================
    // STEP 2: Warm every data type
    // ============================================
    let failed = refresh(&fetchers).await;
    if run_once {
        return if failed == 0 {
            info!("All {} data types loaded", DataType::ALL.len());
            Ok(())
        } else {
            Err(format!("{failed} data type(s) could not be loaded").into())
        };
    }

    // ============================================
    // STEP 3: Keep the cache warm until shutdown
    // ============================================
    let mut ticker = interval(config.refresh_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    info!(
        "Refreshing expired data every {}s",
        config.refresh_interval.as_secs()
    );

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                refresh(&fetchers).await;
            }
            _ = &mut shutdown => break,
        }
    }

    info!("Gearbox shutting down");
    Ok(())
}

/// Fetch every data type, logging the outcome. Returns the number of failures.
async fn refresh(fetchers: &Fetchers) -> usize {
    let mut failed = 0;

    for (data_type, result) in fetchers.fetch_all().await {
        match result {
            Ok(payload) => debug!("'{}' ready ({} bytes)", data_type, payload.len()),
            Err(err) if err.is_blob_failure() => {
                warn!("'{}' unavailable: {}", data_type, err);
                failed += 1;
            }
            Err(err) => {
                error!("'{}' failed: {}", data_type, err);
                failed += 1;
            }
        }
    }

    for entry in fetchers.cache().snapshot() {
        debug!(
            "{:<24} {:>9} bytes  stored {}  age {:>5}s  {}",
            entry.data_type.key(),
            entry.size_bytes,
            entry.stored_at.format("%Y-%m-%d %H:%M:%S"),
            entry.age.as_secs(),
            if entry.valid { "valid" } else { "expired" }
        );
    }

    failed
}

// Graceful shutdown handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }

    info!("Shutting down gracefully...");
}
