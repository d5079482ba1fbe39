//! pendantlink Settings Crate
//!
//! Bridge configuration: file persistence, validation, and mapping onto a
//! protocol profile.

pub mod config;
pub mod error;

pub use config::BridgeConfig;
pub use error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
