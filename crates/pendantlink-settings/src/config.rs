//! Bridge configuration
//!
//! Provides configuration file handling and validation for the pendant bridge.
//! Supports JSON and TOML file formats; the default location is
//! `<platform config dir>/pendantlink/bridge.toml`.

use crate::error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
use pendantlink_communication::{ProtocolProfile, ProtocolVariant};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "pendantlink";
const CONFIG_FILE: &str = "bridge.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

impl Format {
    fn of(path: &Path) -> ConfigResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Format::Json),
            Some("toml") => Ok(Format::Toml),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

/// Settings for the pendant bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Wire protocol spoken by the attached device
    pub protocol: ProtocolVariant,
    /// Override of the protocol's baud rate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baud_rate: Option<u32>,
    /// Liveness timeout in milliseconds
    pub link_timeout_ms: u64,
    /// Connected poll tick in milliseconds
    pub poll_interval_ms: u64,
    /// Delay between failed discovery passes in milliseconds
    pub rescan_delay_ms: u64,
    /// Override of the protocol's handshake window in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handshake_window_ms: Option<u64>,
    /// Append the live feed rate to `sync` frames
    pub include_live_feed: bool,
    /// Only consider USB/ACM/COM style port names
    pub usb_only: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            protocol: ProtocolVariant::Sync,
            baud_rate: None,
            link_timeout_ms: 10_000,
            poll_interval_ms: 10,
            rescan_delay_ms: 1000,
            handshake_window_ms: None,
            include_live_feed: true,
            usb_only: false,
        }
    }
}

impl BridgeConfig {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config file location
    pub fn default_path() -> SettingsResult<PathBuf> {
        let dir = dirs::config_dir().ok_or_else(|| {
            SettingsError::ConfigDirectory("no platform config directory".to_string())
        })?;
        Ok(dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = Format::of(path)?;
        let content = std::fs::read_to_string(path)
            .map_err(|e| SettingsError::LoadError(format!("{}: {}", path.display(), e)))?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::debug!(path = %path.display(), protocol = %config.protocol, "Loaded bridge config");
        Ok(config)
    }

    /// Load config from `path`, or defaults when the file does not exist
    ///
    /// Fails with [`SettingsError::IoError`] when existence cannot be
    /// determined, e.g. an unreadable parent directory.
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.try_exists()? {
            Self::load_from_file(path)
        } else {
            tracing::info!(path = %path.display(), "No bridge config, using defaults");
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML), creating parent directories
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;
        let format = Format::of(path)?;

        let content = match format {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    SettingsError::ConfigDirectory(format!("{}: {}", parent.display(), e))
                })?;
            }
        }

        std::fs::write(path, content)
            .map_err(|e| SettingsError::SaveError(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        fn positive(key: &str, value: u64) -> ConfigResult<()> {
            if value == 0 {
                return Err(ConfigError::ValueOutOfRange {
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
            Ok(())
        }

        positive("link_timeout_ms", self.link_timeout_ms)?;
        positive("poll_interval_ms", self.poll_interval_ms)?;
        positive("rescan_delay_ms", self.rescan_delay_ms)?;
        if let Some(baud) = self.baud_rate {
            positive("baud_rate", u64::from(baud))?;
        }
        if let Some(window) = self.handshake_window_ms {
            positive("handshake_window_ms", window)?;
        }

        if self.poll_interval_ms >= self.link_timeout_ms {
            return Err(ConfigError::Inconsistent(format!(
                "poll interval ({} ms) must be shorter than the link timeout ({} ms)",
                self.poll_interval_ms, self.link_timeout_ms
            )));
        }

        Ok(())
    }

    /// Build the protocol profile this config describes
    pub fn to_profile(&self) -> ProtocolProfile {
        let mut profile = ProtocolProfile::for_variant(self.protocol, self.include_live_feed)
            .with_link_timeout(Duration::from_millis(self.link_timeout_ms))
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
            .with_rescan_delay(Duration::from_millis(self.rescan_delay_ms));

        if let Some(baud) = self.baud_rate {
            profile = profile.with_baud_rate(baud);
        }
        if let Some(window) = self.handshake_window_ms {
            profile = profile.with_handshake_window(Duration::from_millis(window));
        }
        profile
    }
}
