pub mod config;
pub mod types;

pub use config::BridgeConfig;
pub use types::{AdbSettings, FilesystemSettings, StreamSettings, TimeoutSettings};
