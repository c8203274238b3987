pub mod adb_cli;
pub mod transport_trait;
pub mod types;

#[cfg(test)]
pub(crate) mod scripted;

pub use adb_cli::AdbCli;
pub use transport_trait::Transport;
pub use types::{DeviceListing, HostOutput, LogSource};
