// Deterministic in-memory provider for tests and offline dry runs.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::models::TokenModel;
use crate::provider::TokenDataProvider;

#[derive(Debug, Default, Clone)]
pub struct StaticProvider {
    history: HashMap<String, Vec<TokenModel>>,
    migrated: HashSet<String>,
    usd_market_caps: HashMap<String, f64>,
    /// History lookups never complete, for cancellation tests
    stall_history: bool,
    calls: Arc<CallCounts>,
}

#[derive(Debug, Default)]
pub struct CallCounts {
    pub history: AtomicUsize,
    pub migration: AtomicUsize,
    pub enrich: AtomicUsize,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a creator's tokens, newest first.
    pub fn with_history(mut self, creator: &str, tokens: Vec<TokenModel>) -> Self {
        self.history.insert(creator.to_string(), tokens);
        self
    }

    pub fn with_migrated(mut self, token_address: &str) -> Self {
        self.migrated.insert(token_address.to_string());
        self
    }

    pub fn with_usd_market_cap(mut self, token_address: &str, market_cap_usd: f64) -> Self {
        self.usd_market_caps.insert(token_address.to_string(), market_cap_usd);
        self
    }

    pub fn stalling_history(mut self) -> Self {
        self.stall_history = true;
        self
    }

    pub fn calls(&self) -> Arc<CallCounts> {
        self.calls.clone()
    }
}

#[async_trait]
impl TokenDataProvider for StaticProvider {
    fn name(&self) -> &'static str {
        "Static"
    }

    async fn recent_tokens_by_creator(&self, creator: &str, limit: usize) -> Vec<TokenModel> {
        self.calls.history.fetch_add(1, Ordering::SeqCst);
        if self.stall_history {
            std::future::pending::<()>().await;
        }

        self.history
            .get(creator)
            .map(|tokens| tokens.iter().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    async fn is_token_migrated(&self, token_address: &str) -> bool {
        self.calls.migration.fetch_add(1, Ordering::SeqCst);
        self.migrated.contains(token_address)
    }

    async fn enrich_token(&self, token: TokenModel) -> TokenModel {
        self.calls.enrich.fetch_add(1, Ordering::SeqCst);
        match self.usd_market_caps.get(&token.address) {
            Some(cap) => token.with_usd_market_cap(*cap),
            None => token,
        }
    }
}
