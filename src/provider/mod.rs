//! Token data capability used by the filter engine and the ingestor.
//!
//! Implementations never surface errors: every failure collapses to the
//! "unavailable" answer of the operation (empty history, not migrated,
//! token unchanged). Calls are cancelled by dropping their futures.

pub mod fixture;
pub mod market;

use async_trait::async_trait;

use crate::models::TokenModel;

pub use fixture::StaticProvider;
pub use market::MarketDataProvider;

/// Source of creator history, migration status and market data.
#[async_trait]
pub trait TokenDataProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// The creator's most recent tokens, newest first, at most `limit` (1..=10) entries.
    /// Empty for unknown creators or when the lookup fails.
    async fn recent_tokens_by_creator(&self, creator: &str, limit: usize) -> Vec<TokenModel>;

    /// Whether the token has left its launch venue for a liquid market, as of now.
    /// `false` when the lookup fails.
    async fn is_token_migrated(&self, token_address: &str) -> bool;

    /// Fill in missing USD market data. Populated fields are never downgraded
    /// and the token comes back unchanged when no data is available.
    async fn enrich_token(&self, token: TokenModel) -> TokenModel;
}
