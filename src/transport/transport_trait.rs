use std::path::Path;

use async_trait::async_trait;

use super::types::{DeviceListing, HostOutput, LogSource};
use crate::error_handling::types::BridgeError;

/// The debug-bridge daemon as seen by the rest of the crate.
///
/// Implementations only move bytes: they report host-level failures
/// (daemon unreachable, device gone) as [`BridgeError`] and return the remote
/// side's text untouched otherwise. Timeouts, serialization per device and
/// rejection classification live above this trait.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Version handshake. Succeeds iff the daemon answers.
    async fn version(&self) -> Result<String, BridgeError>;

    async fn devices(&self) -> Result<Vec<DeviceListing>, BridgeError>;

    /// Runs `command` through the device shell and returns stdout followed by
    /// stderr. A non-zero remote exit status is not an error.
    async fn shell(&self, serial: &str, command: &str) -> Result<String, BridgeError>;

    async fn push(&self, serial: &str, local: &Path, remote: &str)
        -> Result<HostOutput, BridgeError>;

    async fn pull(&self, serial: &str, remote: &str, local: &Path)
        -> Result<HostOutput, BridgeError>;

    async fn install(&self, serial: &str, apk: &Path) -> Result<HostOutput, BridgeError>;

    /// `address` is `host:port`.
    async fn connect(&self, address: &str) -> Result<HostOutput, BridgeError>;

    async fn disconnect(&self, address: &str) -> Result<HostOutput, BridgeError>;

    /// Starts a long-running device command (e.g. `logcat -v time`) and hands
    /// back its output stream.
    async fn open_stream(&self, serial: &str, args: &[String]) -> Result<LogSource, BridgeError>;
}
