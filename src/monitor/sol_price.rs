// src/monitor/sol_price.rs
//
// Keeps a recent SOL/USD price for converting feed market caps to USD.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::coingecko::CoinGeckoClient;

/// Shared handle to the latest known SOL price (0 until the first fetch).
#[derive(Debug, Clone, Default)]
pub struct SolPrice(Arc<RwLock<f64>>);

impl SolPrice {
    pub fn fixed(price_usd: f64) -> Self {
        Self(Arc::new(RwLock::new(price_usd)))
    }

    pub async fn get(&self) -> f64 {
        *self.0.read().await
    }

    pub async fn set(&self, price_usd: f64) {
        *self.0.write().await = price_usd;
    }
}

/// Periodically refreshes a `SolPrice` from CoinGecko.
pub struct SolPriceTracker {
    client: CoinGeckoClient,
    price: SolPrice,
    refresh_interval: Duration,
}

impl SolPriceTracker {
    pub fn new(client: CoinGeckoClient, refresh_interval: Duration) -> Self {
        Self {
            client,
            price: SolPrice::default(),
            refresh_interval,
        }
    }

    pub fn price(&self) -> SolPrice {
        self.price.clone()
    }

    /// Fetch once. A failed or empty fetch keeps the last known price.
    pub async fn refresh_once(&self) -> f64 {
        match self.client.get_sol_price_usd().await {
            Ok(price) if price > 0.0 => {
                debug!("SOL price: ${:.2}", price);
                self.price.set(price).await;
                price
            }
            Ok(_) => self.price.get().await,
            Err(e) => {
                warn!("Failed to refresh SOL price: {:?}", e);
                self.price.get().await
            }
        }
    }

    /// Refresh on an interval until `cancel` fires.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        info!("Starting SOL price tracker (every {}s)", self.refresh_interval.as_secs());

        tokio::spawn(async move {
            let mut timer = tokio::time::interval(self.refresh_interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("SOL price tracker stopped");
                        break;
                    }
                    _ = timer.tick() => {
                        self.refresh_once().await;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_refresh_keeps_last_price_on_failure() {
        let mut server = mockito::Server::new_async().await;
        let ok = server
            .mock("GET", "/simple/price")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"solana": {"usd": 150.0}}"#)
            .expect(1)
            .create_async()
            .await;

        let client = CoinGeckoClient::new(&server.url(), Duration::from_secs(5)).unwrap();
        let tracker = SolPriceTracker::new(client, Duration::from_secs(60));
        assert_eq!(tracker.refresh_once().await, 150.0);
        ok.assert_async().await;
        ok.remove_async().await;

        server
            .mock("GET", "/simple/price")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        assert_eq!(tracker.refresh_once().await, 150.0);
        assert_eq!(tracker.price().get().await, 150.0);
    }
}
