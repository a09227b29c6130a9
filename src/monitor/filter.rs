//! Multi-criteria filter engine
//!
//! Evaluates one token against a `FilterSettings` snapshot using the creator's
//! recent history. Checks run in a fixed order:
//! 1. Dev - tracked creator wallets (never fails the token)
//! 2. MinCap - every one of the last N tokens reached a minimum USD market cap
//! 3. AvgCap - mean USD market cap of the last N tokens
//! 4. Migration - share of the last N tokens that migrated
//! 5. Last - market cap of the most recent migrated token
//!
//! The creator history is fetched once and shared by checks 2-5.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{MonitorError, MonitorResult};
use crate::models::{FilterSettings, TokenModel};
use crate::provider::TokenDataProvider;

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterResult {
    /// False as soon as any failing-capable check fails
    pub passes: bool,
    /// Diagnostic trail, in check order
    pub reasons: Vec<String>,
    /// OR of the auto-open flags of checks that judged the token favorably.
    /// Independent of `passes`; callers gate on `passes` first.
    pub auto_open_requested: bool,
}

impl Default for FilterResult {
    fn default() -> Self {
        Self {
            passes: true,
            reasons: Vec::new(),
            auto_open_requested: false,
        }
    }
}

impl FilterResult {
    fn favorable(&mut self, reason: impl Into<String>, auto_open: bool) {
        self.reasons.push(reason.into());
        self.auto_open_requested |= auto_open;
    }

    fn fail(&mut self, reason: impl Into<String>) {
        self.passes = false;
        self.reasons.push(reason.into());
    }

    /// Whether the caller should trigger the auto-open side effect.
    pub fn should_auto_open(&self) -> bool {
        self.passes && self.auto_open_requested
    }
}

/// Stateless evaluator; safe to share across sessions.
#[derive(Clone)]
pub struct FilterEngine {
    provider: Arc<dyn TokenDataProvider>,
}

impl FilterEngine {
    pub fn new(provider: Arc<dyn TokenDataProvider>) -> Self {
        Self { provider }
    }

    /// Evaluate `token` against `settings`.
    ///
    /// Every provider call races `cancel`; once it fires the in-flight call is
    /// dropped and `MonitorError::Cancelled` is returned instead of a result.
    pub async fn evaluate(
        &self,
        token: &TokenModel,
        settings: &FilterSettings,
        cancel: &CancellationToken,
    ) -> MonitorResult<FilterResult> {
        let mut result = FilterResult::default();

        // 1. Dev: a miss only withholds the reason and the auto-open signal
        if settings.dev.enabled && settings.dev.is_tracked(&token.dev_address) {
            result.favorable("Dev match", settings.dev.auto_open);
        }

        // 2. Shared history fetch
        let recent = if settings.needs_history() && token.has_creator() {
            let limit = settings.history_limit();
            until_cancelled(
                cancel,
                self.provider.recent_tokens_by_creator(&token.dev_address, limit),
            )
            .await?
        } else {
            Vec::new()
        };

        // 3. MinCap
        if settings.min_cap.enabled {
            let window = take_window(&recent, settings.min_cap.window());
            let ok = !window.is_empty()
                && window.iter().all(|t| t.market_cap_usd >= settings.min_cap.min_value);
            if ok {
                result.favorable("MinCap ok", settings.min_cap.auto_open);
            } else {
                result.fail("MinCap fail");
            }
        }

        // 4. AvgCap
        if settings.avg_cap.enabled {
            let window = take_window(&recent, settings.avg_cap.window());
            let ok = !window.is_empty() && mean_market_cap(window) >= settings.avg_cap.value;
            if ok {
                result.favorable("AvgCap ok", settings.avg_cap.auto_open);
            } else {
                result.fail("AvgCap fail");
            }
        }

        // 5. Migration
        if settings.migration.enabled {
            let window = take_window(&recent, settings.migration.window());
            let mut migrated = 0usize;
            for entry in window {
                if until_cancelled(cancel, self.provider.is_token_migrated(&entry.address)).await? {
                    migrated += 1;
                }
            }

            let percent = migration_percent(migrated, window.len());
            if percent < settings.migration.percent {
                result.fail(format!("Migration {}% < {}%", percent, settings.migration.percent));
            } else {
                result.favorable(format!("Migration {}% ok", percent), settings.migration.auto_open);
            }
        }

        // 6. Last: most recent migrated token, its market cap stands in for the ATH
        if settings.last.is_active() {
            let mut last_migrated = None;
            for entry in &recent {
                if until_cancelled(cancel, self.provider.is_token_migrated(&entry.address)).await? {
                    last_migrated = Some(entry);
                    break;
                }
            }

            match last_migrated {
                None => result.fail("Last: no migrated token found"),
                Some(entry) => {
                    let ath = entry.market_cap_usd;
                    let min = settings.last.min_migrated_ath_usd;
                    if ath < min {
                        result.fail(format!("Last: migrated ATH ${:.0} < ${:.0}", ath, min));
                    } else {
                        result.favorable("Last: ok", settings.last.auto_open);
                    }
                }
            }
        }

        debug!(
            "Evaluated {} ({}): passes={}, reasons={:?}",
            token.ticker, token.address, result.passes, result.reasons
        );

        Ok(result)
    }
}

/// Race a provider call against the session cancellation token.
pub(crate) async fn until_cancelled<F: Future>(cancel: &CancellationToken, fut: F) -> MonitorResult<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(MonitorError::Cancelled),
        output = fut => Ok(output),
    }
}

fn take_window(recent: &[TokenModel], n: usize) -> &[TokenModel] {
    &recent[..recent.len().min(n)]
}

fn mean_market_cap(tokens: &[TokenModel]) -> f64 {
    tokens.iter().map(|t| t.market_cap_usd).sum::<f64>() / tokens.len() as f64
}

/// Rounded percentage, ties to even. An empty window counts as 0%.
fn migration_percent(migrated: usize, count: usize) -> u32 {
    if count == 0 {
        return 0;
    }
    (100.0 * migrated as f64 / count as f64).round_ties_even() as u32
}
