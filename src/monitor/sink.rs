//! Presentation boundary
//!
//! The ingestor never renders anything itself: accepted tokens, running
//! counters and status lines are emitted as `MonitorEvent`s to a `TokenSink`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::models::TokenModel;

/// Display-ready record of an accepted token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptedToken {
    pub ticker: String,
    pub market_cap_usd: f64,
    pub market_cap_display: String,
    pub age_secs: u64,
    pub address: String,
    pub resource_url: String,
}

impl AcceptedToken {
    pub fn from_token(token: &TokenModel, now_unix: i64, resource_base_url: &str) -> Self {
        Self {
            ticker: token.ticker.clone(),
            market_cap_usd: token.market_cap_usd,
            market_cap_display: format!("${}", format_compact(token.market_cap_usd)),
            age_secs: token.age_secs(now_unix),
            address: token.address.clone(),
            resource_url: token.resource_url(resource_base_url),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// Events emitted to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum MonitorEvent {
    /// A token passed every enabled filter
    TokenAccepted {
        token: AcceptedToken,
        timestamp: DateTime<Utc>,
    },

    /// Running counters, sent after every processed frame
    Counters {
        total_observed: u64,
        total_accepted: u64,
    },

    /// Connection and error status line
    Status {
        level: StatusLevel,
        message: String,
    },
}

impl MonitorEvent {
    pub fn status(level: StatusLevel, message: impl Into<String>) -> Self {
        MonitorEvent::Status {
            level,
            message: message.into(),
        }
    }
}

pub trait TokenSink: Send + Sync {
    fn publish(&self, event: MonitorEvent);
}

/// Fans events out to any number of subscribers.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<MonitorEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.tx.subscribe()
    }
}

impl TokenSink for BroadcastSink {
    fn publish(&self, event: MonitorEvent) {
        // Ignore errors (no subscribers)
        let _ = self.tx.send(event);
    }
}

/// Writes events to the log. Used by the binary in place of a UI.
#[derive(Debug, Clone, Default)]
pub struct LogSink;

impl TokenSink for LogSink {
    fn publish(&self, event: MonitorEvent) {
        match event {
            MonitorEvent::TokenAccepted { token, .. } => {
                info!("✅ ${} | MC: {} | {}s ago | CA: {}",
                    token.ticker, token.market_cap_display, token.age_secs, token.address);
            }
            MonitorEvent::Counters { total_observed, total_accepted } => {
                debug!("Total checked: {} | Result: {}", total_observed, total_accepted);
            }
            MonitorEvent::Status { level, message } => match level {
                StatusLevel::Info => info!("STATUS: {}", message),
                StatusLevel::Warning => warn!("STATUS: {}", message),
                StatusLevel::Error => error!("STATUS: {}", message),
            },
        }
    }
}

/// 1.2M / 15.3k / 950 style number for display.
pub fn format_compact(number: f64) -> String {
    if number >= 1_000_000.0 {
        trim_one_decimal(number / 1_000_000.0) + "M"
    } else if number >= 1_000.0 {
        trim_one_decimal(number / 1_000.0) + "k"
    } else {
        format!("{:.0}", number)
    }
}

fn trim_one_decimal(value: f64) -> String {
    let s = format!("{:.1}", value);
    s.strip_suffix(".0").map(str::to_string).unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_compact() {
        assert_eq!(format_compact(950.4), "950");
        assert_eq!(format_compact(15_300.0), "15.3k");
        assert_eq!(format_compact(20_000.0), "20k");
        assert_eq!(format_compact(1_240_000.0), "1.2M");
        assert_eq!(format_compact(3_000_000.0), "3M");
    }

    #[test]
    fn test_accepted_token_record() {
        let token = TokenModel {
            address: "MintZ".to_string(),
            ticker: "ZZ".to_string(),
            market_cap_usd: 15_300.0,
            created_at_unix: 100,
            ..Default::default()
        };

        let record = AcceptedToken::from_token(&token, 112, "https://axiom.trade/meme/");
        assert_eq!(record.market_cap_display, "$15.3k");
        assert_eq!(record.age_secs, 12);
        assert_eq!(record.resource_url, "https://axiom.trade/meme/MintZ");
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = MonitorEvent::Counters { total_observed: 3, total_accepted: 1 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Counters");
        assert_eq!(json["data"]["total_observed"], 3);
    }

    #[test]
    fn test_log_sink_handles_every_event() {
        let sink = LogSink;
        let token = TokenModel {
            address: "MintL".to_string(),
            ticker: "LOG".to_string(),
            ..Default::default()
        };

        sink.publish(MonitorEvent::TokenAccepted {
            token: AcceptedToken::from_token(&token, 0, "https://axiom.trade/meme/"),
            timestamp: Utc::now(),
        });
        sink.publish(MonitorEvent::Counters { total_observed: 1, total_accepted: 0 });
        sink.publish(MonitorEvent::status(StatusLevel::Warning, "slow feed"));
    }

    #[tokio::test]
    async fn test_broadcast_sink_delivers_in_order() {
        let sink = BroadcastSink::new(16);
        let mut rx = sink.subscribe();

        sink.publish(MonitorEvent::status(StatusLevel::Info, "one"));
        sink.publish(MonitorEvent::status(StatusLevel::Info, "two"));

        assert_eq!(rx.recv().await.unwrap(), MonitorEvent::status(StatusLevel::Info, "one"));
        assert_eq!(rx.recv().await.unwrap(), MonitorEvent::status(StatusLevel::Info, "two"));
    }
}
