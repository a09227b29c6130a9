use serde::{Deserialize, Serialize};

/// One observed token, as decoded from the feed or returned by a creator-history lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenModel {
    pub address: String,            // Token mint address, identity key
    pub dev_address: String,        // Creator wallet, empty when unknown
    pub ticker: String,             // Display only
    pub market_cap_native: f64,     // Market cap in SOL
    pub market_cap_usd: f64,        // Authoritative for thresholds, may be 0 before enrichment
    pub created_at_unix: i64,       // Creation time (unix seconds)
    pub chain: String,              // Informational, "solana"
    pub launch_source: String,      // Launch venue tag, e.g. "pump"
}

impl Default for TokenModel {
    fn default() -> Self {
        Self {
            address: String::new(),
            dev_address: String::new(),
            ticker: String::new(),
            market_cap_native: 0.0,
            market_cap_usd: 0.0,
            created_at_unix: 0,
            chain: "solana".to_string(),
            launch_source: String::new(),
        }
    }
}

impl TokenModel {
    /// True when the creator wallet is known.
    pub fn has_creator(&self) -> bool {
        !self.dev_address.trim().is_empty()
    }

    /// Applies an enrichment value. First enrichment wins: a non-zero USD
    /// market cap is never overwritten and non-positive values are ignored.
    pub fn with_usd_market_cap(mut self, market_cap_usd: f64) -> Self {
        if self.market_cap_usd == 0.0 && market_cap_usd.is_finite() && market_cap_usd > 0.0 {
            self.market_cap_usd = market_cap_usd;
        }
        self
    }

    /// Seconds elapsed since creation, never negative.
    pub fn age_secs(&self, now_unix: i64) -> u64 {
        now_unix.saturating_sub(self.created_at_unix).max(0) as u64
    }

    /// Link to the external resource opened for accepted tokens.
    pub fn resource_url(&self, base_url: &str) -> String {
        format!("{}{}", base_url, self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_enrichment_wins() {
        let token = TokenModel {
            address: "Mint111".to_string(),
            ..Default::default()
        };

        let enriched = token.with_usd_market_cap(12_000.0);
        assert_eq!(enriched.market_cap_usd, 12_000.0);

        let again = enriched.with_usd_market_cap(99_000.0);
        assert_eq!(again.market_cap_usd, 12_000.0);
    }

    #[test]
    fn test_enrichment_ignores_invalid_values() {
        let token = TokenModel::default()
            .with_usd_market_cap(-5.0)
            .with_usd_market_cap(f64::NAN);
        assert_eq!(token.market_cap_usd, 0.0);
    }

    #[test]
    fn test_age_and_resource_url() {
        let token = TokenModel {
            address: "AbcMint".to_string(),
            created_at_unix: 1_700_000_000,
            ..Default::default()
        };

        assert_eq!(token.age_secs(1_700_000_042), 42);
        assert_eq!(token.age_secs(1_600_000_000), 0);
        assert_eq!(
            token.resource_url("https://axiom.trade/meme/"),
            "https://axiom.trade/meme/AbcMint"
        );
        assert!(!token.has_creator());
    }
}
