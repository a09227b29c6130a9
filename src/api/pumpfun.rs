//! Pump.fun frontend API client
//!
//! Used for creator history (coins launched by a wallet) and as a keyless
//! fallback for migration status (`complete` flag of a coin).

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::TokenModel;

/// A coin as returned by the pump.fun frontend API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PumpFunCoin {
    pub mint: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub created_timestamp: Option<i64>,   // Milliseconds
    #[serde(default)]
    pub complete: bool,                   // Bonding curve finished, token migrated
    #[serde(default)]
    pub market_cap: Option<f64>,          // SOL
    #[serde(default)]
    pub usd_market_cap: Option<f64>,
    #[serde(default)]
    pub raydium_pool: Option<String>,
}

impl PumpFunCoin {
    pub fn is_migrated(&self) -> bool {
        self.complete || self.raydium_pool.is_some()
    }

    pub fn into_token_model(self) -> TokenModel {
        TokenModel {
            address: self.mint,
            dev_address: self.creator.unwrap_or_default(),
            ticker: self.symbol.unwrap_or_default(),
            market_cap_native: self.market_cap.unwrap_or(0.0).max(0.0),
            market_cap_usd: self.usd_market_cap.unwrap_or(0.0).max(0.0),
            created_at_unix: self.created_timestamp.unwrap_or(0) / 1000,
            chain: "solana".to_string(),
            launch_source: "pump".to_string(),
        }
    }
}

/// The list endpoint has answered both a bare array and a wrapped object over time
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CoinListResponse {
    Bare(Vec<PumpFunCoin>),
    Wrapped { coins: Vec<PumpFunCoin> },
}

impl CoinListResponse {
    fn into_coins(self) -> Vec<PumpFunCoin> {
        match self {
            CoinListResponse::Bare(coins) => coins,
            CoinListResponse::Wrapped { coins } => coins,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PumpFunClient {
    base_url: String,
    client: Client,
}

impl PumpFunClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client for pump.fun")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Coins created by `creator`, newest first, at most `limit` entries.
    pub async fn get_user_created_coins(&self, creator: &str, limit: usize) -> Result<Vec<PumpFunCoin>> {
        let url = format!("{}/coins/user-created-coins/{}", self.base_url, creator);

        debug!("Fetching created coins for {} (limit {})", creator, limit);

        let response = self.client
            .get(&url)
            .header("Accept", "application/json")
            .query(&[
                ("offset", "0".to_string()),
                ("limit", limit.to_string()),
                ("includeNsfw", "true".to_string()),
            ])
            .send()
            .await
            .context("Failed to send request to pump.fun user-created-coins endpoint")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("pump.fun created coins API error for {}: {} - {}", creator, status, error_text);
            return Ok(vec![]);
        }

        let mut coins = response
            .json::<CoinListResponse>()
            .await
            .context("Failed to parse pump.fun user-created-coins response")?
            .into_coins();

        coins.sort_by(|a, b| b.created_timestamp.unwrap_or(0).cmp(&a.created_timestamp.unwrap_or(0)));
        coins.truncate(limit);
        Ok(coins)
    }

    /// Single coin lookup. `None` when pump.fun does not know the mint.
    pub async fn get_coin(&self, mint: &str) -> Result<Option<PumpFunCoin>> {
        let url = format!("{}/coins/{}", self.base_url, mint);

        let response = self.client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request to pump.fun coins endpoint")?;

        let status = response.status();
        if !status.is_success() {
            debug!("pump.fun coin lookup for {} returned {}", mint, status);
            return Ok(None);
        }

        let coin = response
            .json::<PumpFunCoin>()
            .await
            .context("Failed to parse pump.fun coin response")?;

        Ok(Some(coin))
    }
}
