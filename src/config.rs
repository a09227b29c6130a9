use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_FEED_WS_URL: &str = "wss://pumpportal.fun/api/data";
pub const DEFAULT_MORALIS_BASE_URL: &str = "https://solana-gateway.moralis.io";
pub const DEFAULT_PUMPFUN_API_URL: &str = "https://frontend-api-v3.pump.fun";
pub const DEFAULT_COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_RESOURCE_BASE_URL: &str = "https://axiom.trade/meme/";

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    pub feed_ws_url: String,

    pub moralis_api_key: Option<String>, // Optional, disables authenticated calls when missing
    pub moralis_base_url: String,
    pub pumpfun_api_url: String,
    pub coingecko_api_url: String,

    pub sol_price_refresh_secs: u64,
    pub http_timeout_secs: u64,

    pub settings_path: PathBuf,
    pub resource_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_ws_url: DEFAULT_FEED_WS_URL.to_string(),
            moralis_api_key: None,
            moralis_base_url: DEFAULT_MORALIS_BASE_URL.to_string(),
            pumpfun_api_url: DEFAULT_PUMPFUN_API_URL.to_string(),
            coingecko_api_url: DEFAULT_COINGECKO_API_URL.to_string(),
            sol_price_refresh_secs: 60,
            http_timeout_secs: 30,
            settings_path: PathBuf::from("data/settings.json"),
            resource_base_url: DEFAULT_RESOURCE_BASE_URL.to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            feed_ws_url: env::var("FEED_WS_URL").unwrap_or(defaults.feed_ws_url),

            moralis_api_key: env::var("MORALIS_API_KEY")
                .ok()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            moralis_base_url: env::var("MORALIS_BASE_URL").unwrap_or(defaults.moralis_base_url),
            pumpfun_api_url: env::var("PUMPFUN_API_URL").unwrap_or(defaults.pumpfun_api_url),
            coingecko_api_url: env::var("COINGECKO_API_URL").unwrap_or(defaults.coingecko_api_url),

            sol_price_refresh_secs: env::var("SOL_PRICE_REFRESH_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("Failed to parse SOL_PRICE_REFRESH_SECS")?,
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("Failed to parse HTTP_TIMEOUT_SECS")?,

            settings_path: env::var("SETTINGS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.settings_path),
            resource_base_url: env::var("RESOURCE_BASE_URL").unwrap_or(defaults.resource_base_url),
        })
    }
}
