//! Real-time new-token screener.
//!
//! Streams token announcements from a launch-venue feed, enriches them with
//! the creator's recent history and surfaces the ones that pass the
//! user-configured filters.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod monitor;
pub mod provider;
pub mod settings_store;

pub use config::Config;
pub use error::{MonitorError, MonitorResult};
pub use settings_store::SettingsStore;
