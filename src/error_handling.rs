//! Error taxonomy shared by every component of the bridge.

pub mod types;

pub use types::{BridgeError, ConfigError, DecodeIssue, Rejection};
