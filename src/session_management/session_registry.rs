use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, error, info, warn};
use uuid::Uuid;

use super::device_probe::{probe_details, probe_device, DeviceDetails, DeviceInfo};
use super::session::DeviceSession;
use crate::command_channel::CommandChannel;
use crate::error_handling::types::BridgeError;
use crate::transport::Transport;

struct SessionTable {
    generation: Uuid,
    sessions: HashMap<String, Arc<DeviceSession>>,
}

/// Cache of live device sessions, keyed by serial.
///
/// A refresh builds a new table and swaps it in whole. Serials still attached
/// keep their existing session; serials that disappeared are evicted, which
/// invalidates every clone of their session still held by callers.
pub struct SessionRegistry {
    transport: Arc<dyn Transport>,
    channel: CommandChannel,
    table: Mutex<SessionTable>,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl SessionRegistry {
    pub fn new(transport: Arc<dyn Transport>, channel: CommandChannel) -> Self {
        SessionRegistry {
            transport,
            channel,
            table: Mutex::new(SessionTable {
                generation: Uuid::nil(),
                sessions: HashMap::new(),
            }),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    fn table(&self) -> MutexGuard<'_, SessionTable> {
        self.table.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Version handshake with the daemon.
    pub async fn is_alive(&self) -> bool {
        match self.transport.version().await {
            Ok(version) => {
                debug!("Debug bridge answered: {}", version);
                true
            }
            Err(e) => {
                debug!("Debug bridge handshake failed: {}", e);
                false
            }
        }
    }

    /// Re-enumerates attached devices and swaps in a new session table.
    pub async fn refresh(&self) -> Result<Vec<Arc<DeviceSession>>, BridgeError> {
        let _refresh = self.refresh_lock.lock().await;
        let listings = self.transport.devices().await?;
        let generation = Uuid::new_v4();

        let mut table = self.table();
        let mut next = HashMap::new();
        for listing in listings {
            if !listing.is_ready() {
                debug!("Skipping {} in state {}", listing.serial, listing.state);
                continue;
            }
            let session = match table.sessions.remove(&listing.serial) {
                Some(existing) if existing.is_live() => existing,
                _ => Arc::new(DeviceSession::new(
                    &listing.serial,
                    generation,
                    Arc::clone(&self.transport),
                )),
            };
            next.insert(listing.serial, session);
        }

        for (serial, stale) in table.sessions.drain() {
            info!("[{}] device detached, evicting session", serial);
            stale.evict();
        }
        table.sessions = next;
        table.generation = generation;

        let mut sessions: Vec<_> = table.sessions.values().cloned().collect();
        sessions.sort_by(|a, b| a.serial().cmp(b.serial()));
        Ok(sessions)
    }

    /// Enumerates devices and probes each one. Never fails: a dead daemon
    /// yields an empty list and leaves the cache as it was.
    pub async fn discover(&self) -> Vec<DeviceInfo> {
        if !self.is_alive().await {
            warn!("Debug bridge is not reachable, no devices discovered");
            return Vec::new();
        }
        let sessions = match self.refresh().await {
            Ok(sessions) => sessions,
            Err(e) => {
                error!("Device enumeration failed: {}", e);
                return Vec::new();
            }
        };

        let mut devices = Vec::with_capacity(sessions.len());
        for session in &sessions {
            devices.push(probe_device(&self.channel, session).await);
        }
        info!("Discovered {} device(s)", devices.len());
        devices
    }

    /// Cached session for `serial`; on a miss the device list is refreshed once.
    pub async fn resolve(&self, serial: &str) -> Result<Arc<DeviceSession>, BridgeError> {
        if let Some(session) = self.cached(serial) {
            return Ok(session);
        }
        debug!("[{}] not cached, refreshing device list", serial);
        self.refresh().await?;
        self.cached(serial)
            .ok_or_else(|| BridgeError::SessionLost(serial.to_string()))
    }

    fn cached(&self, serial: &str) -> Option<Arc<DeviceSession>> {
        self.table()
            .sessions
            .get(serial)
            .filter(|s| s.is_live())
            .cloned()
    }

    pub fn cached_serials(&self) -> Vec<String> {
        let mut serials: Vec<_> = self.table().sessions.keys().cloned().collect();
        serials.sort();
        serials
    }

    pub fn generation(&self) -> Uuid {
        self.table().generation
    }

    /// Drops the cached session for `serial` and invalidates outstanding clones.
    pub fn evict(&self, serial: &str) {
        if let Some(session) = self.table().sessions.remove(serial) {
            session.evict();
        }
    }

    /// Attaches a device over the network. True when the daemon reports the
    /// connection (including "already connected").
    pub async fn connect_network(&self, host: &str, port: u16) -> Result<bool, BridgeError> {
        let address = format!("{}:{}", host, port);
        let output = self.transport.connect(&address).await?;
        let text = output.text.to_lowercase();
        let connected =
            text.contains("connected to") && !text.contains("failed") && !text.contains("unable");
        if connected {
            info!("[{}] network device connected", address);
            self.refresh().await?;
        } else {
            warn!("[{}] connect failed: {}", address, output.text.trim());
        }
        Ok(connected)
    }

    /// Detaches a network device. USB devices cannot be disconnected.
    pub async fn disconnect_network(&self, serial: &str) -> Result<bool, BridgeError> {
        if !serial.contains(':') {
            return Err(BridgeError::InvalidOperation(format!(
                "{} is not a network device",
                serial
            )));
        }
        let output = self.transport.disconnect(serial).await?;
        self.evict(serial);
        if output.success {
            info!("[{}] network device disconnected", serial);
        } else {
            warn!("[{}] disconnect failed: {}", serial, output.text.trim());
        }
        Ok(output.success)
    }

    pub async fn extended_info(&self, serial: &str) -> Result<DeviceDetails, BridgeError> {
        let session = self.resolve(serial).await?;
        probe_details(&self.channel, &session).await
    }

    pub fn channel(&self) -> &CommandChannel {
        &self.channel
    }
}
