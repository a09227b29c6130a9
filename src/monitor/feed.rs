// src/monitor/feed.rs
//
// PumpPortal new-token feed: subscription payload and frame decoding.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{MonitorError, MonitorResult};
use crate::models::TokenModel;

/// Control frame sent once after connecting
pub fn subscribe_new_token_payload() -> String {
    json!({ "method": "subscribeNewToken" }).to_string()
}

/// Numeric field that the feed sends either as a JSON number or a numeric string
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberOrString {
    Number(f64),
    Text(String),
}

impl NumberOrString {
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            NumberOrString::Number(n) => Some(*n),
            NumberOrString::Text(s) => s.trim().parse::<f64>().ok(),
        }
        .filter(|n| n.is_finite())
    }
}

/// New token event as sent by the feed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTokenEvent {
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub mint: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Creator wallet
    #[serde(default)]
    pub creator: Option<String>,
    /// Creator wallet under the feed's native field name
    #[serde(default)]
    pub trader_public_key: Option<String>,
    #[serde(default)]
    pub market_cap_sol: Option<NumberOrString>,
    /// Unix seconds
    #[serde(default)]
    pub created_time: Option<NumberOrString>,
    /// Launch venue, e.g. "pump" or "bonk"
    #[serde(default)]
    pub source: Option<String>,
    /// Present on subscription acknowledgements
    #[serde(default)]
    pub message: Option<String>,
}

/// A decoded frame
#[derive(Debug, Clone, PartialEq)]
pub enum FeedFrame {
    /// New token announcement. `reported_created_at` is the feed's timestamp, if any.
    Token {
        token: TokenModel,
        reported_created_at: Option<i64>,
    },
    /// Acknowledgement or other control message
    Control(String),
}

/// Decode one text frame.
///
/// `sol_price_usd` converts the SOL market cap to USD (0 leaves the USD value
/// for enrichment); `now_unix` stands in for a missing creation time.
pub fn decode_frame(text: &str, sol_price_usd: f64, now_unix: i64) -> MonitorResult<FeedFrame> {
    let event: NewTokenEvent = serde_json::from_str(text)
        .map_err(|e| MonitorError::Decode(format!("invalid frame: {}", e)))?;

    let mint = event.mint.as_deref().map(str::trim).unwrap_or_default();
    if mint.is_empty() {
        return match event.message {
            Some(message) => Ok(FeedFrame::Control(message)),
            None => Err(MonitorError::Decode("frame has no mint".to_string())),
        };
    }

    let market_cap_sol = match &event.market_cap_sol {
        None => 0.0,
        Some(value) => value
            .to_f64()
            .ok_or_else(|| MonitorError::Decode(format!("marketCapSol is not numeric: {:?}", value)))?
            .max(0.0),
    };

    let reported_created_at = match &event.created_time {
        None => None,
        Some(value) => Some(
            value
                .to_f64()
                .ok_or_else(|| MonitorError::Decode(format!("createdTime is not numeric: {:?}", value)))?
                as i64,
        ),
    };

    let market_cap_usd = if sol_price_usd > 0.0 {
        market_cap_sol * sol_price_usd
    } else {
        0.0
    };

    let token = TokenModel {
        address: mint.to_string(),
        dev_address: event
            .creator
            .or(event.trader_public_key)
            .unwrap_or_default()
            .trim()
            .to_string(),
        ticker: event.symbol.unwrap_or_else(|| "???".to_string()),
        market_cap_native: market_cap_sol,
        market_cap_usd,
        created_at_unix: reported_created_at.unwrap_or(now_unix),
        chain: "solana".to_string(),
        launch_source: event.source.unwrap_or_default(),
    };

    Ok(FeedFrame::Token {
        token,
        reported_created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expect_token(frame: FeedFrame) -> (TokenModel, Option<i64>) {
        match frame {
            FeedFrame::Token { token, reported_created_at } => (token, reported_created_at),
            other => panic!("expected token frame, got {:?}", other),
        }
    }

    #[test]
    fn test_subscribe_payload() {
        let payload: serde_json::Value = serde_json::from_str(&subscribe_new_token_payload()).unwrap();
        assert_eq!(payload["method"], "subscribeNewToken");
    }

    #[test]
    fn test_decode_full_event() {
        let json = r#"{
            "signature": "sig1",
            "mint": "MintAAA",
            "symbol": "PEPE",
            "creator": "DevBBB",
            "marketCapSol": 30.5,
            "createdTime": 1700000000,
            "source": "pump"
        }"#;

        let (token, created) = expect_token(decode_frame(json, 200.0, 1_800_000_000).unwrap());
        assert_eq!(token.address, "MintAAA");
        assert_eq!(token.dev_address, "DevBBB");
        assert_eq!(token.ticker, "PEPE");
        assert_eq!(token.market_cap_native, 30.5);
        assert_eq!(token.market_cap_usd, 6100.0);
        assert_eq!(token.created_at_unix, 1_700_000_000);
        assert_eq!(created, Some(1_700_000_000));
        assert_eq!(token.launch_source, "pump");
    }

    #[test]
    fn test_decode_native_field_names_and_string_cap() {
        let json = r#"{
            "mint": "MintCCC",
            "traderPublicKey": "DevDDD",
            "marketCapSol": "27.95",
            "txType": "create"
        }"#;

        let (token, created) = expect_token(decode_frame(json, 0.0, 1_750_000_000).unwrap());
        assert_eq!(token.dev_address, "DevDDD");
        assert_eq!(token.ticker, "???");
        assert!((token.market_cap_native - 27.95).abs() < 1e-9);
        assert_eq!(token.market_cap_usd, 0.0);
        assert_eq!(token.created_at_unix, 1_750_000_000);
        assert!(created.is_none());
    }

    #[test]
    fn test_decode_acknowledgement() {
        let json = r#"{"message": "Successfully subscribed to token creation events."}"#;
        assert_eq!(
            decode_frame(json, 0.0, 0).unwrap(),
            FeedFrame::Control("Successfully subscribed to token creation events.".to_string())
        );
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(decode_frame("not json", 0.0, 0), Err(MonitorError::Decode(_))));
        assert!(matches!(decode_frame(r#"{"symbol": "X"}"#, 0.0, 0), Err(MonitorError::Decode(_))));
        assert!(matches!(
            decode_frame(r#"{"mint": "M", "marketCapSol": "lots"}"#, 0.0, 0),
            Err(MonitorError::Decode(_))
        ));
    }
}
