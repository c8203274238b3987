use super::types::*;
use crate::error_handling::types::ConfigError;
use clap::Args;
use log::debug;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Construction options for the bridge.
///
/// The bridge never reads ambient global state: everything it needs is carried
/// by this value and handed to [`crate::bridge::Bridge::new`]. It can be built
/// from a TOML file with [`BridgeConfig::from_file`] or from command-line flags
/// through the `clap` derive (the binary flattens it into its own arguments).
///
/// # File layout
///
/// ```toml
/// [adb]
/// path = "adb"
/// host = "127.0.0.1"
/// port = 5037
/// default_device_port = 5555
///
/// [timeouts]
/// command_secs = 30
/// transfer_secs = 300
///
/// [stream]
/// grace_millis = 500
/// buffer = 1024
///
/// [filesystem]
/// max_symlink_hops = 10
/// upload_fallback_dir = "/sdcard/Download"
/// screenshot_remote_path = "/sdcard/screenshot.png"
/// ```
///
/// Every table and key is optional; missing values take the defaults above.
#[derive(Args, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct BridgeConfig {
    #[command(flatten)]
    pub adb: AdbSettings,

    #[command(flatten)]
    pub timeouts: TimeoutSettings,

    #[command(flatten)]
    pub stream: StreamSettings,

    #[command(flatten)]
    pub filesystem: FilesystemSettings,
}

impl BridgeConfig {
    /// Reads and validates a TOML configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parses and validates configuration text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig =
            toml::from_str(content).map_err(|e| ConfigError::TomlError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the values a working bridge depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.adb.path.trim().is_empty() {
            return Err(ConfigError::InvalidValue("adb.path is empty".to_string()));
        }
        if self.adb.port == 0 {
            return Err(ConfigError::NotInRange("adb.port must be in 1..=65535".to_string()));
        }
        if self.adb.default_device_port == 0 {
            return Err(ConfigError::NotInRange(
                "adb.default_device_port must be in 1..=65535".to_string(),
            ));
        }
        if self.timeouts.command_secs == 0 || self.timeouts.transfer_secs == 0 {
            return Err(ConfigError::NotInRange(
                "timeouts must be at least one second".to_string(),
            ));
        }
        if self.stream.grace_millis == 0 {
            return Err(ConfigError::NotInRange(
                "stream.grace_millis must be positive".to_string(),
            ));
        }
        if self.stream.buffer == 0 {
            return Err(ConfigError::NotInRange("stream.buffer must be positive".to_string()));
        }
        if self.filesystem.max_symlink_hops == 0 {
            return Err(ConfigError::NotInRange(
                "filesystem.max_symlink_hops must be positive".to_string(),
            ));
        }
        if !self.filesystem.upload_fallback_dir.starts_with('/') {
            return Err(ConfigError::InvalidValue(format!(
                "filesystem.upload_fallback_dir must be absolute: {}",
                self.filesystem.upload_fallback_dir
            )));
        }
        if !self.filesystem.screenshot_remote_path.starts_with('/') {
            return Err(ConfigError::InvalidValue(format!(
                "filesystem.screenshot_remote_path must be absolute: {}",
                self.filesystem.screenshot_remote_path
            )));
        }
        Ok(())
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.command_secs)
    }

    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.transfer_secs)
    }

    pub fn stream_grace(&self) -> Duration {
        Duration::from_millis(self.stream.grace_millis)
    }
}
