//! Filter configuration snapshot.
//!
//! Stored values are kept as entered; window sizes are clamped when the
//! engine reads them, thresholds are validated when the settings are saved.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

use crate::error::MonitorError;

/// Window ceiling for the min/avg market cap checks
pub const MAX_CAP_WINDOW: u32 = 3;
/// Window ceiling for the migration check and the history fetch
pub const MAX_HISTORY_WINDOW: u32 = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterSettings {
    #[serde(alias = "MinCap")]
    pub min_cap: MinCapFilter,
    #[serde(alias = "AvgCap")]
    pub avg_cap: AvgCapFilter,
    #[serde(alias = "Dev")]
    pub dev: DevFilter,
    #[serde(alias = "Migration")]
    pub migration: MigrationFilter,
    #[serde(alias = "Last")]
    pub last: LastFilter,
}

/// Every one of the creator's last `n` tokens must reach `min_value` USD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MinCapFilter {
    #[serde(alias = "Enabled")]
    pub enabled: bool,
    #[serde(alias = "N", deserialize_with = "lenient_u32")]
    pub n: u32,
    #[serde(alias = "MinValue")]
    pub min_value: f64,
    #[serde(alias = "AutoOpen")]
    pub auto_open: bool,
}

/// Mean USD market cap of the creator's last `n` tokens must reach `value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AvgCapFilter {
    #[serde(alias = "Enabled")]
    pub enabled: bool,
    #[serde(alias = "N", deserialize_with = "lenient_u32")]
    pub n: u32,
    #[serde(alias = "Value")]
    pub value: f64,
    #[serde(alias = "AutoOpen")]
    pub auto_open: bool,
}

/// Tracked creator wallets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DevFilter {
    #[serde(alias = "Enabled")]
    pub enabled: bool,
    #[serde(alias = "Addresses")]
    pub addresses: HashSet<String>,
    #[serde(alias = "AutoOpen")]
    pub auto_open: bool,
}

/// Share (percent) of the creator's last `n` tokens that migrated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MigrationFilter {
    #[serde(alias = "Enabled")]
    pub enabled: bool,
    #[serde(alias = "N", deserialize_with = "lenient_u32")]
    pub n: u32,
    #[serde(alias = "Percent", deserialize_with = "lenient_u32")]
    pub percent: u32,
    #[serde(alias = "AutoOpen")]
    pub auto_open: bool,
}

/// Market cap of the creator's most recent migrated token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LastFilter {
    #[serde(alias = "Enabled")]
    pub enabled: bool,
    #[serde(alias = "MinMigratedAthUsd")]
    pub min_migrated_ath_usd: f64,
    #[serde(alias = "AutoOpen")]
    pub auto_open: bool,
}

/// Window sizes and percentages from hand-edited files: any JSON number or
/// numeric string, negatives floored at 0, fractions truncated.
fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Text(String),
    }

    let value = match Raw::deserialize(deserializer)? {
        Raw::Int(n) => n as f64,
        Raw::Float(f) => f,
        Raw::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| D::Error::custom(format!("expected a number, got {:?}", s)))?,
    };

    if !value.is_finite() {
        return Err(D::Error::custom("expected a finite number"));
    }
    Ok(value.clamp(0.0, u32::MAX as f64) as u32)
}

impl Default for MinCapFilter {
    fn default() -> Self {
        Self {
            enabled: false,
            n: 2,
            min_value: 14_500.0,
            auto_open: false,
        }
    }
}

impl Default for AvgCapFilter {
    fn default() -> Self {
        Self {
            enabled: false,
            n: 2,
            value: 20_300.0,
            auto_open: false,
        }
    }
}

impl Default for MigrationFilter {
    fn default() -> Self {
        Self {
            enabled: false,
            n: 2,
            percent: 50,
            auto_open: false,
        }
    }
}

impl MinCapFilter {
    pub fn window(&self) -> usize {
        self.n.clamp(1, MAX_CAP_WINDOW) as usize
    }
}

impl AvgCapFilter {
    pub fn window(&self) -> usize {
        self.n.clamp(1, MAX_CAP_WINDOW) as usize
    }
}

impl MigrationFilter {
    pub fn window(&self) -> usize {
        self.n.clamp(1, MAX_HISTORY_WINDOW) as usize
    }
}

impl LastFilter {
    /// The check only runs with a positive threshold.
    pub fn is_active(&self) -> bool {
        self.enabled && self.min_migrated_ath_usd > 0.0
    }
}

impl DevFilter {
    pub fn is_tracked(&self, creator: &str) -> bool {
        !self.addresses.is_empty() && self.addresses.contains(creator)
    }
}

impl FilterSettings {
    /// Whether evaluation needs the creator's token history.
    pub fn needs_history(&self) -> bool {
        self.min_cap.enabled || self.avg_cap.enabled || self.migration.enabled || self.last.is_active()
    }

    /// History fetch size shared by all history-based checks.
    pub fn history_limit(&self) -> usize {
        self.min_cap
            .n
            .max(self.avg_cap.n)
            .max(self.migration.n)
            .clamp(1, MAX_HISTORY_WINDOW) as usize
    }

    /// Edit-time cleanup and validation, applied before settings are saved.
    pub fn normalized(mut self) -> Result<Self, MonitorError> {
        for (name, value) in [
            ("minCap.minValue", self.min_cap.min_value),
            ("avgCap.value", self.avg_cap.value),
            ("last.minMigratedAthUsd", self.last.min_migrated_ath_usd),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(MonitorError::Config(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        self.migration.percent = self.migration.percent.min(100);
        self.dev.addresses = self
            .dev
            .addresses
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_factory_values() {
        let settings = FilterSettings::default();
        assert_eq!(settings.min_cap.n, 2);
        assert_eq!(settings.min_cap.min_value, 14_500.0);
        assert_eq!(settings.avg_cap.value, 20_300.0);
        assert_eq!(settings.migration.percent, 50);
        assert!(!settings.needs_history());
    }

    #[test]
    fn test_windows_are_clamped() {
        let mut settings = FilterSettings::default();
        settings.min_cap.n = 7;
        settings.avg_cap.n = 0;
        settings.migration.n = 25;

        assert_eq!(settings.min_cap.window(), 3);
        assert_eq!(settings.avg_cap.window(), 1);
        assert_eq!(settings.migration.window(), 10);
        assert_eq!(settings.history_limit(), 10);
    }

    #[test]
    fn test_last_filter_needs_positive_threshold() {
        let mut settings = FilterSettings::default();
        settings.last.enabled = true;
        assert!(!settings.needs_history());

        settings.last.min_migrated_ath_usd = 1.0;
        assert!(settings.needs_history());
    }

    #[test]
    fn test_normalized_cleans_and_validates() {
        let mut settings = FilterSettings::default();
        settings.migration.percent = 140;
        settings.dev.addresses = ["  Dev1 ".to_string(), "   ".to_string()].into_iter().collect();

        let normalized = settings.clone().normalized().unwrap();
        assert_eq!(normalized.migration.percent, 100);
        assert_eq!(normalized.dev.addresses.len(), 1);
        assert!(normalized.dev.addresses.contains("Dev1"));

        settings.avg_cap.value = -1.0;
        assert!(matches!(settings.normalized(), Err(MonitorError::Config(_))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "minCap": { "enabled": true, "minValue": 5000 }, "dev": { "addresses": ["D1"] } }"#;
        let settings: FilterSettings = serde_json::from_str(json).unwrap();
        assert!(settings.min_cap.enabled);
        assert_eq!(settings.min_cap.n, 2);
        assert_eq!(settings.min_cap.min_value, 5000.0);
        assert!(settings.dev.is_tracked("D1"));
        assert_eq!(settings.migration.percent, 50);
    }

    #[test]
    fn test_pascal_case_file_is_accepted() {
        let json = r#"{
            "MinCap": { "Enabled": true, "N": 3, "MinValue": 9000, "AutoOpen": true },
            "Migration": { "Enabled": true, "N": 4, "Percent": 75, "AutoOpen": false },
            "Dev": { "Enabled": true, "Addresses": ["D9"], "AutoOpen": false },
            "Last": { "Enabled": true, "MinMigratedAthUsd": 40000 },
            "AutoOpenAxiom": true
        }"#;

        let settings: FilterSettings = serde_json::from_str(json).unwrap();
        assert!(settings.min_cap.enabled && settings.min_cap.auto_open);
        assert_eq!(settings.min_cap.n, 3);
        assert_eq!(settings.min_cap.min_value, 9000.0);
        assert_eq!(settings.migration.n, 4);
        assert_eq!(settings.migration.percent, 75);
        assert!(settings.dev.is_tracked("D9"));
        assert!(settings.last.is_active());
        assert_eq!(settings.avg_cap, AvgCapFilter::default());
    }

    #[test]
    fn test_out_of_range_integers_do_not_reject_file() {
        let json = r#"{
            "minCap": { "enabled": true, "n": -1, "minValue": 5000 },
            "avgCap": { "n": "2" },
            "migration": { "n": 2.7, "percent": -20 }
        }"#;

        let settings: FilterSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.min_cap.n, 0);
        assert_eq!(settings.min_cap.window(), 1);
        assert!(settings.min_cap.enabled);
        assert_eq!(settings.avg_cap.n, 2);
        assert_eq!(settings.migration.n, 2);
        assert_eq!(settings.migration.percent, 0);

        let bad = r#"{ "migration": { "percent": "half" } }"#;
        assert!(serde_json::from_str::<FilterSettings>(bad).is_err());
    }
}
