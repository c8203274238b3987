pub mod batch_query;
pub mod bridge;
pub mod command_channel;
pub mod configuration;
pub mod error_handling;
pub mod listing;
pub mod log_stream;
pub mod mutations;
pub mod path_resolver;
pub mod remote_control;
pub mod session_management;
pub mod transport;

pub use bridge::Bridge;
pub use configuration::BridgeConfig;
pub use error_handling::{BridgeError, ConfigError};
