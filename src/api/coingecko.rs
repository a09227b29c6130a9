use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

// Structure for the /simple/price endpoint response
#[derive(Debug, Deserialize)]
struct SimplePriceResponse {
    solana: Option<SimplePriceData>,
}

#[derive(Debug, Deserialize)]
struct SimplePriceData {
    usd: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    base_url: String,
    client: Client,
}

impl CoinGeckoClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client for CoinGecko")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// SOL price in USD. Returns 0 when the API answers without a usable price.
    pub async fn get_sol_price_usd(&self) -> Result<f64> {
        let url = format!("{}/simple/price", self.base_url);

        let response = self.client
            .get(&url)
            .query(&[("ids", "solana"), ("vs_currencies", "usd")])
            .send()
            .await
            .context("Failed to send SOL price request to CoinGecko API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("CoinGecko SOL price API error: {} - {}; returning 0", status, error_text);
            return Ok(0.0);
        }

        let response_data: SimplePriceResponse = match response.json().await {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to parse CoinGecko SOL price response: {:?}; returning 0", e);
                return Ok(0.0);
            }
        };

        let price = response_data
            .solana
            .and_then(|d| d.usd)
            .filter(|p| p.is_finite() && *p > 0.0)
            .unwrap_or(0.0);
        Ok(price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sol_price() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/simple/price")
            .match_query(mockito::Matcher::UrlEncoded("ids".into(), "solana".into()))
            .with_status(200)
            .with_body(r#"{"solana": {"usd": 187.42}}"#)
            .create_async()
            .await;

        let client = CoinGeckoClient::new(&server.url(), Duration::from_secs(5)).unwrap();
        let price = client.get_sol_price_usd().await.unwrap();
        assert!((price - 187.42).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_sol_price_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/simple/price")
            .match_query(mockito::Matcher::Any)
            .with_status(429)
            .create_async()
            .await;

        let client = CoinGeckoClient::new(&server.url(), Duration::from_secs(5)).unwrap();
        assert_eq!(client.get_sol_price_usd().await.unwrap(), 0.0);
    }
}
