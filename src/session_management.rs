//! Device discovery and the session cache.
//!
//! A session is the live handle to one attached device. The registry owns the
//! cache, and eviction is the only way a session dies.

use serde::Serialize;

/// Batched device probing used at discovery time.
pub mod device_probe;
/// The per-device handle.
pub mod session;
/// Serial-keyed session cache.
pub mod session_registry;

pub use device_probe::{ConnectionKind, DeviceDetails, DeviceInfo};
pub use session::DeviceSession;
pub use session_registry::SessionRegistry;

/// Whether a session may still be used.
///
/// Variants:
/// - `Live`: The session holds a transport handle.
/// - `Evicted`: The device detached or was disconnected; every operation fails
///   with `SessionLost`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Live,
    Evicted,
}
