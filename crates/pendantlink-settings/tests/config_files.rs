//! Bridge config persistence

use pendantlink_communication::ProtocolVariant;
use pendantlink_settings::{BridgeConfig, ConfigError, SettingsError};
use tempfile::TempDir;

#[test]
fn test_toml_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("bridge.toml");

    let config = BridgeConfig {
        protocol: ProtocolVariant::Lcd,
        baud_rate: Some(57_600),
        usb_only: true,
        ..Default::default()
    };
    config.save_to_file(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("protocol = \"lcd\""));
    assert!(!text.contains("handshake_window_ms"));

    assert_eq!(BridgeConfig::load_from_file(&path).unwrap(), config);
}

#[test]
fn test_json_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bridge.json");

    let config = BridgeConfig {
        protocol: ProtocolVariant::Compact,
        handshake_window_ms: Some(2500),
        ..Default::default()
    };
    config.save_to_file(&path).unwrap();
    assert_eq!(BridgeConfig::load_from_file(&path).unwrap(), config);
}

#[test]
fn test_unsupported_extension() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bridge.yaml");

    let err = BridgeConfig::default().save_to_file(&path).unwrap_err();
    assert!(matches!(
        err,
        SettingsError::Config(ConfigError::UnsupportedFormat(ref ext)) if ext == "yaml"
    ));
}

#[test]
fn test_invalid_file_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bridge.toml");
    std::fs::write(&path, "link_timeout_ms = 0\n").unwrap();

    let err = BridgeConfig::load_from_file(&path).unwrap_err();
    assert!(matches!(err, SettingsError::Config(_)));

    std::fs::write(&path, "protocol = \"carrier-pigeon\"\n").unwrap();
    assert!(matches!(
        BridgeConfig::load_from_file(&path),
        Err(SettingsError::TomlError(_))
    ));
}

#[test]
fn test_load_or_default() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.toml");
    assert_eq!(
        BridgeConfig::load_or_default(&missing).unwrap(),
        BridgeConfig::default()
    );

    let path = dir.path().join("bridge.toml");
    std::fs::write(&path, "protocol = \"compact\"\nrescan_delay_ms = 250\n").unwrap();
    let config = BridgeConfig::load_or_default(&path).unwrap();
    assert_eq!(config.protocol, ProtocolVariant::Compact);
    assert_eq!(config.rescan_delay_ms, 250);
}

#[test]
fn test_default_path_layout() {
    if let Ok(path) = BridgeConfig::default_path() {
        assert!(path.ends_with("pendantlink/bridge.toml"));
    }
}

#[cfg(unix)]
#[test]
fn test_load_or_default_reports_unreachable_path() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("not-a-dir");
    std::fs::write(&file, "").unwrap();

    let err = BridgeConfig::load_or_default(&file.join("bridge.toml")).unwrap_err();
    assert!(matches!(err, SettingsError::IoError(_)));
}
