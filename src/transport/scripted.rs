//! In-memory [`Transport`] with canned replies, for unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::transport_trait::Transport;
use super::types::{DeviceListing, HostOutput, LogSource};
use crate::error_handling::types::BridgeError;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Replies are matched on the exact command text; unmatched shell commands
/// answer with empty output. Every issued command is recorded.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    down: AtomicBool,
    devices: Mutex<Vec<DeviceListing>>,
    replies: Mutex<HashMap<String, String>>,
    host_replies: Mutex<HashMap<String, HostOutput>>,
    lost: Mutex<HashSet<String>>,
    failing_pushes: Mutex<HashMap<String, String>>,
    streams: Mutex<VecDeque<LogSource>>,
    issued: Mutex<Vec<String>>,
    shell_delay: Mutex<Option<std::time::Duration>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_devices(serials: &[&str]) -> Self {
        let transport = Self::new();
        transport.set_devices(serials);
        transport
    }

    pub(crate) fn set_devices(&self, serials: &[&str]) {
        *lock(&self.devices) = serials
            .iter()
            .map(|s| DeviceListing::new(*s, "device"))
            .collect();
    }

    pub(crate) fn set_listing(&self, listing: Vec<DeviceListing>) {
        *lock(&self.devices) = listing;
    }

    pub(crate) fn set_daemon_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub(crate) fn reply(&self, command: &str, text: &str) {
        lock(&self.replies).insert(command.to_string(), text.to_string());
    }

    /// Scripts a host operation, keyed like the issued log (`connect 10.0.0.2:5555`).
    pub(crate) fn host_reply(&self, key: &str, success: bool, text: &str) {
        lock(&self.host_replies).insert(key.to_string(), HostOutput::new(success, text));
    }

    /// Shell commands for `serial` fail as if the device vanished.
    pub(crate) fn lose_device(&self, serial: &str) {
        lock(&self.lost).insert(serial.to_string());
    }

    pub(crate) fn fail_push_to(&self, remote: &str, text: &str) {
        lock(&self.failing_pushes).insert(remote.to_string(), text.to_string());
    }

    pub(crate) fn queue_stream(&self, source: LogSource) {
        lock(&self.streams).push_back(source);
    }

    pub(crate) fn delay_shell(&self, delay: std::time::Duration) {
        *lock(&self.shell_delay) = Some(delay);
    }

    pub(crate) fn issued(&self) -> Vec<String> {
        lock(&self.issued).clone()
    }

    pub(crate) fn issued_count(&self, command: &str) -> usize {
        lock(&self.issued).iter().filter(|c| *c == command).count()
    }

    fn record(&self, entry: String) {
        lock(&self.issued).push(entry);
    }

    fn check_daemon(&self) -> Result<(), BridgeError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(BridgeError::TransportUnavailable(
                "cannot connect to daemon".to_string(),
            ));
        }
        Ok(())
    }

    fn check_device(&self, serial: &str) -> Result<(), BridgeError> {
        self.check_daemon()?;
        if lock(&self.lost).contains(serial) {
            return Err(BridgeError::SessionLost(serial.to_string()));
        }
        Ok(())
    }

    fn host(&self, key: String) -> HostOutput {
        let output = lock(&self.host_replies)
            .get(&key)
            .cloned()
            .unwrap_or_else(|| HostOutput::new(true, ""));
        self.record(key);
        output
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn version(&self) -> Result<String, BridgeError> {
        self.check_daemon()?;
        Ok("Android Debug Bridge version 1.0.41".to_string())
    }

    async fn devices(&self) -> Result<Vec<DeviceListing>, BridgeError> {
        self.check_daemon()?;
        self.record("devices".to_string());
        Ok(lock(&self.devices).clone())
    }

    async fn shell(&self, serial: &str, command: &str) -> Result<String, BridgeError> {
        self.check_device(serial)?;
        self.record(command.to_string());
        let delay = *lock(&self.shell_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(lock(&self.replies).get(command).cloned().unwrap_or_default())
    }

    async fn push(
        &self,
        serial: &str,
        local: &Path,
        remote: &str,
    ) -> Result<HostOutput, BridgeError> {
        self.check_device(serial)?;
        self.record(format!("push {} {}", local.display(), remote));
        match lock(&self.failing_pushes).get(remote) {
            Some(text) => Ok(HostOutput::new(false, text.clone())),
            None => Ok(HostOutput::new(true, "1 file pushed")),
        }
    }

    async fn pull(
        &self,
        serial: &str,
        remote: &str,
        local: &Path,
    ) -> Result<HostOutput, BridgeError> {
        self.check_device(serial)?;
        Ok(self.host(format!("pull {} {}", remote, local.display())))
    }

    async fn install(&self, serial: &str, apk: &Path) -> Result<HostOutput, BridgeError> {
        self.check_device(serial)?;
        Ok(self.host(format!("install {}", apk.display())))
    }

    async fn connect(&self, address: &str) -> Result<HostOutput, BridgeError> {
        self.check_daemon()?;
        Ok(self.host(format!("connect {}", address)))
    }

    async fn disconnect(&self, address: &str) -> Result<HostOutput, BridgeError> {
        self.check_daemon()?;
        Ok(self.host(format!("disconnect {}", address)))
    }

    async fn open_stream(&self, serial: &str, args: &[String]) -> Result<LogSource, BridgeError> {
        self.check_device(serial)?;
        self.record(args.join(" "));
        lock(&self.streams)
            .pop_front()
            .ok_or_else(|| BridgeError::TransportUnavailable("no scripted stream".to_string()))
    }
}
