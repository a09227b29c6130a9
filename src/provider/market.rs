// Market data adapter over the pump.fun frontend API and the Moralis gateway.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use crate::api::moralis::MoralisClient;
use crate::api::pumpfun::PumpFunClient;
use crate::config::Config;
use crate::models::settings::MAX_HISTORY_WINDOW;
use crate::models::TokenModel;
use crate::provider::TokenDataProvider;

/// Total supply of every pump.fun token, used to turn a price into a market cap
pub const PUMP_TOKEN_SUPPLY: f64 = 1_000_000_000.0;

#[derive(Debug, Clone)]
pub struct MarketDataProvider {
    moralis: MoralisClient,
    pumpfun: PumpFunClient,
}

impl MarketDataProvider {
    pub fn new(moralis: MoralisClient, pumpfun: PumpFunClient) -> Self {
        if !moralis.has_api_key() {
            warn!("MORALIS_API_KEY not set: enrichment disabled, migration status falls back to pump.fun");
        }
        Self { moralis, pumpfun }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let timeout = Duration::from_secs(config.http_timeout_secs);
        let moralis = MoralisClient::new(
            config.moralis_api_key.as_deref(),
            &config.moralis_base_url,
            timeout,
        )?;
        let pumpfun = PumpFunClient::new(&config.pumpfun_api_url, timeout)?;
        Ok(Self::new(moralis, pumpfun))
    }
}

#[async_trait]
impl TokenDataProvider for MarketDataProvider {
    fn name(&self) -> &'static str {
        "MarketData"
    }

    async fn recent_tokens_by_creator(&self, creator: &str, limit: usize) -> Vec<TokenModel> {
        if creator.trim().is_empty() {
            return vec![];
        }
        let limit = limit.clamp(1, MAX_HISTORY_WINDOW as usize);

        match self.pumpfun.get_user_created_coins(creator, limit).await {
            Ok(coins) => {
                debug!("Creator {} has {} recent tokens", creator, coins.len());
                coins.into_iter().map(|c| c.into_token_model()).collect()
            }
            Err(e) => {
                warn!("Creator history lookup failed for {}: {:?}", creator, e);
                vec![]
            }
        }
    }

    async fn is_token_migrated(&self, token_address: &str) -> bool {
        if self.moralis.has_api_key() {
            return match self.moralis.get_bonding_status(token_address).await {
                Ok(Some(status)) => status.is_graduated(),
                Ok(None) => false,
                Err(e) => {
                    warn!("Bonding status lookup failed for {}: {:?}", token_address, e);
                    false
                }
            };
        }

        match self.pumpfun.get_coin(token_address).await {
            Ok(Some(coin)) => coin.is_migrated(),
            Ok(None) => false,
            Err(e) => {
                warn!("Coin lookup failed for {}: {:?}", token_address, e);
                false
            }
        }
    }

    async fn enrich_token(&self, token: TokenModel) -> TokenModel {
        if token.market_cap_usd > 0.0 {
            return token;
        }

        match self.moralis.get_token_price_usd(&token.address).await {
            Ok(Some(price)) => {
                let market_cap_usd = price * PUMP_TOKEN_SUPPLY;
                debug!("Enriched {} with USD market cap {:.0}", token.address, market_cap_usd);
                token.with_usd_market_cap(market_cap_usd)
            }
            Ok(None) => token,
            Err(e) => {
                warn!("Price lookup failed for {}: {:?}", token.address, e);
                token
            }
        }
    }
}
