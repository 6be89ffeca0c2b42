//! Asset Cache - command line fetcher
//!
//! Fetches every URL given on the command line through the asset manager and
//! prints the resulting cache statistics as JSON.

use anyhow::{bail, Context};
use tokio::sync::oneshot;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use asset_cache::{spawn_cleanup_task, AssetManager, Config};

/// Main entry point.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the asset manager and start the TTL cleanup task
/// 4. Fan out over the URLs and wait for every result
/// 5. Print cache statistics
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "asset_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let urls: Vec<String> = std::env::args().skip(1).collect();
    if urls.is_empty() {
        bail!("usage: asset_cache <url>...");
    }

    let config = Config::from_env();
    info!(
        "Configuration loaded: cache_capacity={}, cache_ttl={}s, fetch_timeout={}s, cleanup_interval={}s",
        config.cache_capacity, config.cache_ttl, config.fetch_timeout, config.cleanup_interval
    );

    let manager = AssetManager::from_config(&config);
    let cleanup_handle = spawn_cleanup_task(manager.cache().clone(), config.cleanup_period());

    let (done_tx, done_rx) = oneshot::channel();
    manager.request_many(
        urls,
        |url, result| match result {
            Ok(bytes) => info!(url = %url, size = bytes.len(), "fetched asset"),
            Err(err) => warn!(url = %url, error = %err, "failed to fetch asset"),
        },
        move || {
            let _ = done_tx.send(());
        },
    );
    done_rx.await.context("fan-out ended before reporting completion")?;

    cleanup_handle.abort();

    let stats = manager.stats().await;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
