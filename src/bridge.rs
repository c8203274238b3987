//! Serial-keyed entry point to every device operation.
//!
//! [`Bridge`] wires the session registry, command channel, path resolver and
//! log streamer together from one [`crate::configuration::BridgeConfig`].
//! Callers only ever name devices by serial.
//!
//! Example (non-running):
//! ```ignore
//! use droidbridge::{Bridge, BridgeConfig};
//!
//! let bridge = Bridge::new(BridgeConfig::default())?;
//! for device in bridge.discover_devices().await {
//!     println!("{} {}", device.serial, device.display_name());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod bridge_handler;

pub use bridge_handler::Bridge;
