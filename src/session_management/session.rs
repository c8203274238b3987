use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use log::debug;
use tokio::sync::MutexGuard as AsyncMutexGuard;
use uuid::Uuid;

use super::SessionState;
use crate::error_handling::types::BridgeError;
use crate::transport::Transport;

/// A live handle to one attached device.
///
/// Sessions are shared as `Arc<DeviceSession>`: the registry keeps one, and
/// every in-flight operation holds a clone. Eviction takes the transport
/// handle away, so clones still held elsewhere fail with
/// [`BridgeError::SessionLost`] instead of reaching a stale device.
pub struct DeviceSession {
    serial: String,
    generation: Uuid,
    created_at: DateTime<Utc>,
    transport: Mutex<Option<Arc<dyn Transport>>>,
    command_lock: tokio::sync::Mutex<()>,
    streaming: AtomicBool,
}

impl DeviceSession {
    pub(crate) fn new(serial: &str, generation: Uuid, transport: Arc<dyn Transport>) -> Self {
        debug!("[{}] session created (generation {})", serial, generation);
        DeviceSession {
            serial: serial.to_string(),
            generation,
            created_at: Utc::now(),
            transport: Mutex::new(Some(transport)),
            command_lock: tokio::sync::Mutex::new(()),
            streaming: AtomicBool::new(false),
        }
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Identifier of the discovery pass that created this session.
    pub fn generation(&self) -> Uuid {
        self.generation
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Network-attached devices are addressed as `host:port`.
    pub fn is_network(&self) -> bool {
        self.serial.contains(':')
    }

    pub fn state(&self) -> SessionState {
        if self.slot().is_some() {
            SessionState::Live
        } else {
            SessionState::Evicted
        }
    }

    pub fn is_live(&self) -> bool {
        self.state() == SessionState::Live
    }

    /// The transport handle, or `SessionLost` once the session was evicted.
    pub fn transport(&self) -> Result<Arc<dyn Transport>, BridgeError> {
        self.slot()
            .clone()
            .ok_or_else(|| BridgeError::SessionLost(self.serial.clone()))
    }

    pub(crate) fn evict(&self) {
        if self.slot().take().is_some() {
            debug!("[{}] session evicted", self.serial);
        }
    }

    /// Serializes commands against this device. Held for the whole round trip.
    pub(crate) async fn lock_commands(&self) -> AsyncMutexGuard<'_, ()> {
        self.command_lock.lock().await
    }

    /// Claims the single log-stream slot. False if a stream is already active.
    pub(crate) fn try_begin_stream(&self) -> bool {
        self.streaming
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub(crate) fn end_stream(&self) {
        self.streaming.store(false, Ordering::SeqCst);
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::SeqCst)
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Arc<dyn Transport>>> {
        self.transport.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("serial", &self.serial)
            .field("generation", &self.generation)
            .field("state", &self.state())
            .field("streaming", &self.is_streaming())
            .finish()
    }
}
