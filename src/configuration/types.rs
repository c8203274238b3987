use clap::Args;
use serde::Deserialize;

pub const DEFAULT_ADB_PATH: &str = "adb";
pub const DEFAULT_ADB_HOST: &str = "127.0.0.1";
pub const DEFAULT_ADB_PORT: u16 = 5037;
pub const DEFAULT_DEVICE_PORT: u16 = 5555;
pub const DEFAULT_MAX_SYMLINK_HOPS: usize = 10;

/// Where the `adb` client binary lives and which server it talks to.
#[derive(Args, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AdbSettings {
    /// Path to the `adb` client binary
    #[arg(long = "adb-path", env = "DROIDBRIDGE_ADB", default_value = DEFAULT_ADB_PATH)]
    pub path: String,

    /// Host of the adb server
    #[arg(long = "adb-host", default_value = DEFAULT_ADB_HOST)]
    pub host: String,

    /// Port of the adb server
    #[arg(long = "adb-port", default_value_t = DEFAULT_ADB_PORT)]
    pub port: u16,

    /// Port used by `connect` when none is given
    #[arg(long = "device-port", default_value_t = DEFAULT_DEVICE_PORT)]
    pub default_device_port: u16,
}

impl Default for AdbSettings {
    fn default() -> Self {
        Self {
            path: DEFAULT_ADB_PATH.to_string(),
            host: DEFAULT_ADB_HOST.to_string(),
            port: DEFAULT_ADB_PORT,
            default_device_port: DEFAULT_DEVICE_PORT,
        }
    }
}

#[derive(Args, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TimeoutSettings {
    /// Upper bound for a single shell round trip
    #[arg(long = "command-timeout-secs", default_value_t = 30)]
    pub command_secs: u64,

    /// Upper bound for push, pull and install
    #[arg(long = "transfer-timeout-secs", default_value_t = 300)]
    pub transfer_secs: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            command_secs: 30,
            transfer_secs: 300,
        }
    }
}

#[derive(Args, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct StreamSettings {
    /// Time a stopping log stream gets before it is killed
    #[arg(long = "stream-grace-millis", default_value_t = 500)]
    pub grace_millis: u64,

    /// Records buffered between the log reader and the consumer
    #[arg(long = "stream-buffer", default_value_t = 1024)]
    pub buffer: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            grace_millis: 500,
            buffer: 1024,
        }
    }
}

#[derive(Args, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FilesystemSettings {
    /// Maximum number of symlink hops followed while resolving a path
    #[arg(long = "max-symlink-hops", default_value_t = DEFAULT_MAX_SYMLINK_HOPS)]
    pub max_symlink_hops: usize,

    /// Remote directory retried when an upload to the requested path fails
    #[arg(long = "upload-fallback-dir", default_value = "/sdcard/Download")]
    pub upload_fallback_dir: String,

    /// Scratch file used on the device while taking a screenshot
    #[arg(long = "screenshot-remote-path", default_value = "/sdcard/screenshot.png")]
    pub screenshot_remote_path: String,
}

impl Default for FilesystemSettings {
    fn default() -> Self {
        Self {
            max_symlink_hops: DEFAULT_MAX_SYMLINK_HOPS,
            upload_fallback_dir: "/sdcard/Download".to_string(),
            screenshot_remote_path: "/sdcard/screenshot.png".to_string(),
        }
    }
}
