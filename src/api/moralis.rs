//! Moralis API Client for Solana token market data
//!
//! Provides access to the Moralis Solana gateway endpoints used by the screener:
//! - /token/mainnet/{address}/price - USD price of a token
//! - /token/mainnet/{address}/bonding-status - Pump.fun bonding / graduation status
//!
//! Every endpoint needs an API key. A client built without one stays usable but
//! answers `None` without touching the network.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

// ============================================================================
// Response Structures
// ============================================================================

/// Response for the token price endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoralisTokenPrice {
    #[serde(default)]
    pub usd_price: Option<f64>,
    #[serde(default)]
    pub exchange_name: Option<String>,
}

/// Response for the bonding status endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoralisBondingStatus {
    #[serde(default)]
    pub mint: Option<String>,
    #[serde(default)]
    pub bonding_progress: Option<f64>,   // 0-100 percentage
    #[serde(default)]
    pub graduated_at: Option<String>,    // ISO timestamp, present once graduated
}

impl MoralisBondingStatus {
    /// A token counts as migrated once it graduated or finished its bonding curve
    pub fn is_graduated(&self) -> bool {
        self.graduated_at.is_some() || self.bonding_progress.unwrap_or(0.0) >= 100.0
    }
}

// ============================================================================
// Moralis Client
// ============================================================================

#[derive(Debug, Clone)]
pub struct MoralisClient {
    api_key: Option<String>,
    base_url: String,
    client: Client,
}

impl MoralisClient {
    /// Create a new Moralis client
    pub fn new(api_key: Option<&str>, base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client for Moralis")?;

        Ok(Self {
            api_key: api_key.map(str::to_string),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Fetch the USD price of a token. `None` when unknown or no key is configured.
    pub async fn get_token_price_usd(&self, token_address: &str) -> Result<Option<f64>> {
        let url = format!("{}/token/mainnet/{}/price", self.base_url, token_address);

        let response: Option<MoralisTokenPrice> = self.get_json(&url, "price").await?;
        Ok(response
            .and_then(|p| p.usd_price)
            .filter(|price| price.is_finite() && *price > 0.0))
    }

    /// Fetch the bonding status of a Pump.fun token
    pub async fn get_bonding_status(&self, token_address: &str) -> Result<Option<MoralisBondingStatus>> {
        let url = format!("{}/token/mainnet/{}/bonding-status", self.base_url, token_address);
        self.get_json(&url, "bonding-status").await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str, endpoint: &str) -> Result<Option<T>> {
        let api_key = match &self.api_key {
            Some(key) => key,
            None => {
                debug!("Skipping Moralis {} call: no API key configured", endpoint);
                return Ok(None);
            }
        };

        debug!("Fetching Moralis {}: {}", endpoint, url);

        let response = self.client
            .get(url)
            .header("X-API-Key", api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("Failed to send request to Moralis {} endpoint", endpoint))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            debug!("Moralis {} returned 404 for {}", endpoint, url);
            return Ok(None);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Moralis {} API error: {} - {}", endpoint, status, error_text);
            return Ok(None);
        }

        let data = response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse Moralis {} response", endpoint))?;

        Ok(Some(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str, api_key: Option<&str>) -> MoralisClient {
        MoralisClient::new(api_key, base_url, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_bonding_status_parsing() {
        let json = r#"{
            "mint": "ABC123",
            "bondingProgress": 100,
            "graduatedAt": "2025-01-20T10:00:00.000Z"
        }"#;

        let status: MoralisBondingStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.mint.as_deref(), Some("ABC123"));
        assert!(status.is_graduated());

        let bonding: MoralisBondingStatus = serde_json::from_str(r#"{"bondingProgress": 42.5}"#).unwrap();
        assert!(!bonding.is_graduated());
    }

    #[tokio::test]
    async fn test_price_sends_api_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/token/mainnet/MintA/price")
            .match_header("x-api-key", "secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"usdPrice": 0.0000215, "exchangeName": "Pump.Fun"}"#)
            .create_async()
            .await;

        let price = client(&server.url(), Some("secret"))
            .get_token_price_usd("MintA")
            .await
            .unwrap();

        mock.assert_async().await;
        assert!((price.unwrap() - 0.0000215).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_http_error_yields_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/token/mainnet/MintB/bonding-status")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let status = client(&server.url(), Some("secret"))
            .get_bonding_status("MintB")
            .await
            .unwrap();
        assert!(status.is_none());
    }

    #[tokio::test]
    async fn test_missing_key_skips_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/token/mainnet/MintC/price")
            .expect(0)
            .create_async()
            .await;

        let client = client(&server.url(), None);
        assert!(!client.has_api_key());
        assert!(client.get_token_price_usd("MintC").await.unwrap().is_none());
        mock.assert_async().await;
    }
}
