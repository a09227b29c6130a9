use anyhow::{Context, Result};
use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use token_screener::api::CoinGeckoClient;
use token_screener::config::Config;
use token_screener::monitor::{IngestorConfig, IngestorState, LogOpener, LogSink, SolPriceTracker, StreamIngestor};
use token_screener::provider::MarketDataProvider;
use token_screener::settings_store::SettingsStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables first so RUST_LOG from .env applies
    dotenv().ok();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::load()?;
    info!("Configuration loaded successfully");

    // Filter settings
    let store = SettingsStore::new(&config.settings_path);
    let settings = store.load().await;
    info!(
        "Filters: minCap={} avgCap={} dev={} ({} wallets) migration={} last={}",
        settings.min_cap.enabled,
        settings.avg_cap.enabled,
        settings.dev.enabled,
        settings.dev.addresses.len(),
        settings.migration.enabled,
        settings.last.is_active()
    );

    let shutdown = CancellationToken::new();

    // SOL price for SOL -> USD market cap conversion
    let coingecko = CoinGeckoClient::new(
        &config.coingecko_api_url,
        Duration::from_secs(config.http_timeout_secs),
    )?;
    let tracker = SolPriceTracker::new(coingecko, Duration::from_secs(config.sol_price_refresh_secs.max(1)));
    tracker.refresh_once().await;
    let sol_price = tracker.price();
    let tracker_handle = tracker.spawn(shutdown.clone());

    // Token data provider
    let provider = MarketDataProvider::from_config(&config).context("Failed to initialize market data provider")?;
    info!("Market data provider initialized");

    let ingestor = StreamIngestor::new(
        IngestorConfig::from(&config),
        Arc::new(provider),
        Arc::new(LogSink),
        Arc::new(LogOpener),
        sol_price,
    );

    ingestor.start(settings).await.context("Failed to start feed ingestion")?;
    info!("🚀 Token screener running. Press Ctrl-C to stop.");

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Failed to listen for Ctrl-C: {}", e);
            }
            info!("Shutdown signal received");
        }
        state = ingestor.wait_finished() => {
            if state == IngestorState::Faulted {
                warn!("Feed session faulted, shutting down");
            }
        }
    }

    ingestor.stop().await?;
    shutdown.cancel();
    let _ = tracker_handle.await;

    info!("Token screener stopped");
    Ok(())
}
