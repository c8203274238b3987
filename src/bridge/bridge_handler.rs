use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::batch_query;
use crate::command_channel::CommandChannel;
use crate::configuration::BridgeConfig;
use crate::error_handling::types::{BridgeError, ConfigError};
use crate::listing::types::{AppEntry, LogRecord, ProcessEntry};
use crate::log_stream::{LogStreamer, StreamFilter, StreamHandle};
use crate::mutations::{self, Outcome};
use crate::path_resolver::{self, DirectoryListing, PathResolver};
use crate::remote_control::{self, KeyCode, ScreenSize};
use crate::session_management::{DeviceDetails, DeviceInfo, DeviceSession, SessionRegistry};
use crate::transport::{AdbCli, Transport};

/// The bridge's upward interface. Every device operation is keyed by serial;
/// sessions are resolved (and refreshed on a miss) behind the scenes.
pub struct Bridge {
    config: BridgeConfig,
    registry: SessionRegistry,
    resolver: PathResolver,
    streamer: LogStreamer,
}

impl Bridge {
    /// Builds a bridge that drives the `adb` client named in `config`.
    pub fn new(config: BridgeConfig) -> Result<Self, ConfigError> {
        let transport = Arc::new(AdbCli::new(&config.adb));
        Self::with_transport(config, transport)
    }

    pub fn with_transport(
        config: BridgeConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let channel = CommandChannel::from_config(&config);
        let resolver = PathResolver::new(config.filesystem.max_symlink_hops);
        let streamer = LogStreamer::from_config(&config);
        info!(
            "Bridge ready (adb server {}:{})",
            config.adb.host, config.adb.port
        );
        Ok(Bridge {
            registry: SessionRegistry::new(transport, channel),
            resolver,
            streamer,
            config,
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    fn channel(&self) -> &CommandChannel {
        self.registry.channel()
    }

    async fn session(&self, serial: &str) -> Result<Arc<DeviceSession>, BridgeError> {
        self.registry.resolve(serial).await
    }

    /// A device that vanished mid-operation is dropped from the cache so the
    /// next call re-enumerates.
    fn settle<T>(&self, serial: &str, result: Result<T, BridgeError>) -> Result<T, BridgeError> {
        if let Err(BridgeError::SessionLost(_)) = &result {
            warn!("[{}] session lost, evicting", serial);
            self.registry.evict(serial);
        }
        result
    }

    pub async fn is_transport_alive(&self) -> bool {
        self.registry.is_alive().await
    }

    // Devices

    pub async fn discover_devices(&self) -> Vec<DeviceInfo> {
        self.registry.discover().await
    }

    pub async fn extended_device_info(&self, serial: &str) -> Result<DeviceDetails, BridgeError> {
        let result = self.registry.extended_info(serial).await;
        self.settle(serial, result)
    }

    /// Connects `host:port`; `port` defaults to the configured device port.
    pub async fn connect_network(&self, host: &str, port: Option<u16>) -> Result<bool, BridgeError> {
        let port = port.unwrap_or(self.config.adb.default_device_port);
        self.registry.connect_network(host, port).await
    }

    pub async fn disconnect_network(&self, serial: &str) -> Result<bool, BridgeError> {
        self.registry.disconnect_network(serial).await
    }

    // Files

    pub async fn list_directory(
        &self,
        serial: &str,
        path: &str,
        show_hidden: bool,
    ) -> Result<DirectoryListing, BridgeError> {
        let session = self.session(serial).await?;
        let result = path_resolver::list_directory(
            self.channel(),
            &self.resolver,
            &session,
            path,
            show_hidden,
        )
        .await;
        self.settle(serial, result)
    }

    /// Uploads a file, retrying into the configured fallback directory when
    /// the requested destination is refused.
    pub async fn push(&self, serial: &str, local: &Path, remote: &str) -> Result<Outcome, BridgeError> {
        let session = self.session(serial).await?;
        let result = mutations::files::push(
            self.channel(),
            &session,
            local,
            remote,
            &self.config.filesystem.upload_fallback_dir,
        )
        .await;
        self.settle(serial, result)
    }

    pub async fn pull(&self, serial: &str, remote: &str, local: &Path) -> Result<Outcome, BridgeError> {
        let session = self.session(serial).await?;
        let result = mutations::files::pull(self.channel(), &session, remote, local).await;
        self.settle(serial, result)
    }

    pub async fn delete(
        &self,
        serial: &str,
        path: &str,
        is_directory: bool,
    ) -> Result<Outcome, BridgeError> {
        let session = self.session(serial).await?;
        let result = mutations::files::delete(self.channel(), &session, path, is_directory).await;
        self.settle(serial, result)
    }

    pub async fn rename(&self, serial: &str, from: &str, to: &str) -> Result<Outcome, BridgeError> {
        let session = self.session(serial).await?;
        let result = mutations::files::rename(self.channel(), &session, from, to).await;
        self.settle(serial, result)
    }

    pub async fn make_directory(&self, serial: &str, path: &str) -> Result<Outcome, BridgeError> {
        let session = self.session(serial).await?;
        let result = mutations::files::make_directory(self.channel(), &session, path).await;
        self.settle(serial, result)
    }

    // Applications

    pub async fn list_apps(
        &self,
        serial: &str,
        system: bool,
    ) -> Result<Vec<AppEntry>, BridgeError> {
        let session = self.session(serial).await?;
        let result = batch_query::list_apps(self.channel(), &session, system).await;
        self.settle(serial, result)
    }

    pub async fn app_info(&self, serial: &str, package: &str) -> Result<Option<AppEntry>, BridgeError> {
        let session = self.session(serial).await?;
        let result = batch_query::app_info(self.channel(), &session, package).await;
        self.settle(serial, result)
    }

    pub async fn install_apk(&self, serial: &str, apk: &Path) -> Result<Outcome, BridgeError> {
        let session = self.session(serial).await?;
        let result = mutations::apps::install(self.channel(), &session, apk).await;
        self.settle(serial, result)
    }

    pub async fn uninstall(&self, serial: &str, package: &str) -> Result<Outcome, BridgeError> {
        let session = self.session(serial).await?;
        let result = mutations::apps::uninstall(self.channel(), &session, package).await;
        self.settle(serial, result)
    }

    pub async fn start_app(&self, serial: &str, package: &str) -> Result<Outcome, BridgeError> {
        let session = self.session(serial).await?;
        let result = mutations::apps::start(self.channel(), &session, package).await;
        self.settle(serial, result)
    }

    pub async fn stop_app(&self, serial: &str, package: &str) -> Result<Outcome, BridgeError> {
        let session = self.session(serial).await?;
        let result = mutations::apps::stop(self.channel(), &session, package).await;
        self.settle(serial, result)
    }

    pub async fn clear_app_data(&self, serial: &str, package: &str) -> Result<Outcome, BridgeError> {
        let session = self.session(serial).await?;
        let result = mutations::apps::clear_data(self.channel(), &session, package).await;
        self.settle(serial, result)
    }

    pub async fn is_running(&self, serial: &str, package: &str) -> Result<bool, BridgeError> {
        let session = self.session(serial).await?;
        let result = batch_query::is_running(self.channel(), &session, package).await;
        self.settle(serial, result)
    }

    pub async fn running_set(&self, serial: &str) -> Result<HashSet<String>, BridgeError> {
        let session = self.session(serial).await?;
        let result = batch_query::running_set(self.channel(), &session).await;
        self.settle(serial, result)
    }

    // Processes

    pub async fn list_processes(&self, serial: &str) -> Result<Vec<ProcessEntry>, BridgeError> {
        let session = self.session(serial).await?;
        let result = batch_query::list_processes(self.channel(), &session).await;
        self.settle(serial, result)
    }

    pub async fn process_info(&self, serial: &str, pid: u32) -> Result<Option<ProcessEntry>, BridgeError> {
        let session = self.session(serial).await?;
        let result = batch_query::process_info(self.channel(), &session, pid).await;
        self.settle(serial, result)
    }

    pub async fn kill(&self, serial: &str, pid: u32) -> Result<Outcome, BridgeError> {
        let session = self.session(serial).await?;
        let result = mutations::processes::kill(self.channel(), &session, pid).await;
        self.settle(serial, result)
    }

    pub async fn force_kill(&self, serial: &str, pid: u32) -> Result<Outcome, BridgeError> {
        let session = self.session(serial).await?;
        let result = mutations::processes::force_kill(self.channel(), &session, pid).await;
        self.settle(serial, result)
    }

    // Logs

    /// Starts streaming the device log into `on_record`. The handle must be
    /// stopped (or dropped) to end the stream.
    pub async fn start_log_stream<F>(
        &self,
        serial: &str,
        filter: StreamFilter,
        on_record: F,
    ) -> Result<StreamHandle, BridgeError>
    where
        F: FnMut(LogRecord) + Send + 'static,
    {
        let session = self.session(serial).await?;
        let result = self.streamer.start(session, filter, on_record).await;
        self.settle(serial, result)
    }

    pub async fn stop_log_stream(&self, handle: &mut StreamHandle) {
        handle.stop().await;
    }

    pub async fn clear_log_buffer(&self, serial: &str) -> Result<Outcome, BridgeError> {
        let session = self.session(serial).await?;
        let result = self.channel().run_classified(&session, "logcat -c").await;
        let outcome = self.settle(serial, result).map(|r| Outcome::from_reply("logcat -c", &r))?;
        debug!("[{}] log buffer cleared: {}", serial, outcome);
        Ok(outcome)
    }

    // Remote control

    pub async fn tap(&self, serial: &str, x: u32, y: u32) -> Result<Outcome, BridgeError> {
        let session = self.session(serial).await?;
        let result = remote_control::input::tap(self.channel(), &session, x, y).await;
        self.settle(serial, result)
    }

    /// Swipes between two points; `duration_ms` defaults to 300.
    pub async fn swipe(
        &self,
        serial: &str,
        from: (u32, u32),
        to: (u32, u32),
        duration_ms: Option<u32>,
    ) -> Result<Outcome, BridgeError> {
        let session = self.session(serial).await?;
        let duration = duration_ms.unwrap_or(remote_control::DEFAULT_SWIPE_MILLIS);
        let result = remote_control::input::swipe(self.channel(), &session, from, to, duration).await;
        self.settle(serial, result)
    }

    pub async fn send_text(&self, serial: &str, text: &str) -> Result<Outcome, BridgeError> {
        let session = self.session(serial).await?;
        let result = remote_control::input::send_text(self.channel(), &session, text).await;
        self.settle(serial, result)
    }

    pub async fn send_key(&self, serial: &str, key: KeyCode) -> Result<Outcome, BridgeError> {
        let session = self.session(serial).await?;
        let result = remote_control::input::send_key(self.channel(), &session, key).await;
        self.settle(serial, result)
    }

    pub async fn screen_size(&self, serial: &str) -> Result<ScreenSize, BridgeError> {
        let session = self.session(serial).await?;
        let result = remote_control::input::screen_size(self.channel(), &session).await;
        self.settle(serial, result)
    }

    /// Saves a PNG of the current screen to `local`.
    pub async fn screenshot(&self, serial: &str, local: &Path) -> Result<Outcome, BridgeError> {
        let session = self.session(serial).await?;
        let result = remote_control::input::screenshot(
            self.channel(),
            &session,
            &self.config.filesystem.screenshot_remote_path,
            local,
        )
        .await;
        self.settle(serial, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::types::Severity;
    use crate::mutations::Fallback;
    use crate::transport::scripted::ScriptedTransport;
    use crate::transport::LogSource;
    use std::sync::Mutex;
    use std::time::Duration;

    fn bridge(serials: &[&str]) -> (Arc<ScriptedTransport>, Bridge) {
        let transport = Arc::new(ScriptedTransport::with_devices(serials));
        let bridge = Bridge::with_transport(BridgeConfig::default(), transport.clone()).unwrap();
        (transport, bridge)
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = BridgeConfig::default();
        config.adb.port = 0;
        let transport = Arc::new(ScriptedTransport::new());
        assert!(Bridge::with_transport(config, transport).is_err());
    }

    #[tokio::test]
    async fn test_discover_twice_keeps_sessions() {
        let (transport, bridge) = bridge(&["emulator-5554", "192.168.1.20:5555"]);
        transport.reply(
            &crate::session_management::device_probe::snapshot_command(),
            "[ro.product.model]: [Pixel 7]\n[ro.build.version.release]: [14]\n",
        );

        let first = bridge.discover_devices().await;
        let session = bridge.registry().resolve("emulator-5554").await.unwrap();
        let second = bridge.discover_devices().await;

        let serials: Vec<_> = second.iter().map(|d| d.serial.clone()).collect();
        assert_eq!(serials, vec!["192.168.1.20:5555", "emulator-5554"]);
        assert_eq!(first.len(), second.len());
        assert_eq!(second[1].model, "Pixel 7");
        let again = bridge.registry().resolve("emulator-5554").await.unwrap();
        assert!(Arc::ptr_eq(&session, &again));
    }

    #[tokio::test]
    async fn test_unknown_serial_is_session_lost() {
        let (_transport, bridge) = bridge(&["emulator-5554"]);
        assert!(matches!(
            bridge.list_processes("R58M123ABC").await,
            Err(BridgeError::SessionLost(_))
        ));
    }

    #[tokio::test]
    async fn test_vanished_device_is_evicted() {
        let (transport, bridge) = bridge(&["emulator-5554"]);
        bridge.registry().refresh().await.unwrap();
        transport.lose_device("emulator-5554");

        assert!(matches!(
            bridge.tap("emulator-5554", 10, 10).await,
            Err(BridgeError::SessionLost(_))
        ));
        assert!(bridge.registry().cached_serials().is_empty());
    }

    #[tokio::test]
    async fn test_transport_down_degrades_discovery() {
        let (transport, bridge) = bridge(&["emulator-5554"]);
        transport.set_daemon_down(true);
        assert!(!bridge.is_transport_alive().await);
        assert!(bridge.discover_devices().await.is_empty());
    }

    #[tokio::test]
    async fn test_connect_uses_default_port() {
        let (transport, bridge) = bridge(&[]);
        transport.host_reply(
            "connect 192.168.1.20:5555",
            true,
            "connected to 192.168.1.20:5555\n",
        );
        assert!(bridge.connect_network("192.168.1.20", None).await.unwrap());
        assert!(!bridge.connect_network("192.168.1.20", Some(5556)).await.unwrap());
    }

    #[tokio::test]
    async fn test_kill_fallback_is_reported() {
        let (transport, bridge) = bridge(&["emulator-5554"]);
        transport.reply("kill 4242 2>&1", "/system/bin/sh: kill: 4242: Operation not permitted\n");
        transport.reply("ps -p 4242 -o NAME", "NAME\ncom.example.app\n");

        let outcome = bridge.kill("emulator-5554", 4242).await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(
            outcome.fallback(),
            Some(&Fallback::PackageForceStopped {
                pid: 4242,
                package: "com.example.app".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_push_uses_configured_fallback_dir() {
        let (transport, bridge) = bridge(&["emulator-5554"]);
        transport.fail_push_to("/system/notes.txt", "remote couldn't create file: Read-only file system");
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("notes.txt");
        std::fs::write(&local, "hello").unwrap();

        let outcome = bridge
            .push("emulator-5554", &local, "/system/notes.txt")
            .await
            .unwrap();
        assert!(matches!(
            outcome.fallback(),
            Some(Fallback::UploadRedirected { actual, .. }) if actual == "/sdcard/Download/notes.txt"
        ));
    }

    #[tokio::test]
    async fn test_every_consumer_classifies_alike() {
        use crate::command_channel::classifier::VOCABULARY;
        use crate::command_channel::Reply;
        use crate::transport::HostOutput;

        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("a.txt");
        std::fs::write(&local, "x").unwrap();

        for (pid, &(phrase, expected)) in (700u32..).zip(VOCABULARY.iter()) {
            let (transport, bridge) = bridge(&["emulator-5554"]);
            let shell_text = format!("/system/bin/sh: x: {}\n", phrase);
            let host_text = format!("adb: error: remote {}", phrase);

            let reply = Reply::from_text(shell_text.clone());
            assert_eq!(reply.rejection, Some(expected), "{}", phrase);
            let outcome = Outcome::from_reply("op", &reply);
            assert_eq!(outcome.failure().and_then(|f| f.rejection), Some(expected), "{}", phrase);
            let host = Reply::from_host(HostOutput::new(false, host_text.clone()));
            assert_eq!(host.rejection, Some(expected), "{}", phrase);

            transport.reply("ls -l '/data/x' 2>&1", &format!("ls: /data/x: {}\n", phrase));
            let listing = bridge
                .list_directory("emulator-5554", "/data/x", false)
                .await
                .unwrap();
            assert_eq!(listing.rejection, Some(expected), "{}", phrase);

            transport.reply(
                &format!("kill {} 2>&1", pid),
                &format!("/system/bin/sh: kill: {}: {}\n", pid, phrase),
            );
            let outcome = bridge.kill("emulator-5554", pid).await.unwrap();
            assert_eq!(outcome.failure().and_then(|f| f.rejection), Some(expected), "{}", phrase);

            transport.fail_push_to("/data/local/tmp/a.txt", &host_text);
            transport.fail_push_to("/sdcard/Download/a.txt", &host_text);
            let outcome = bridge
                .push("emulator-5554", &local, "/data/local/tmp/a.txt")
                .await
                .unwrap();
            assert_eq!(outcome.failure().and_then(|f| f.rejection), Some(expected), "{}", phrase);
        }
    }

    #[tokio::test]
    async fn test_log_stream_and_clear() {
        let (transport, bridge) = bridge(&["emulator-5554"]);
        let mock = tokio_test::io::Builder::new()
            .read(b"01-15 10:30:45.123 E/AndroidRuntime( 4242): FATAL EXCEPTION: main\n")
            .build();
        transport.queue_stream(LogSource::from_reader(mock));

        let records = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&records);
        let mut handle = bridge
            .start_log_stream(
                "emulator-5554",
                StreamFilter::new(Severity::Error, Some("AndroidRuntime".into())),
                move |record| sink.lock().unwrap().push(record),
            )
            .await
            .unwrap();

        for _ in 0..200 {
            if !records.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        bridge.stop_log_stream(&mut handle).await;

        let records = records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].entry().unwrap().pid, 4242);

        assert!(bridge
            .clear_log_buffer("emulator-5554")
            .await
            .unwrap()
            .is_success());
        let issued = transport.issued();
        assert!(issued.contains(&"logcat -v time AndroidRuntime:E *:S".to_string()));
        assert!(issued.contains(&"logcat -c".to_string()));
    }

    #[tokio::test]
    async fn test_swipe_default_duration() {
        let (transport, bridge) = bridge(&["emulator-5554"]);
        bridge
            .swipe("emulator-5554", (500, 1600), (500, 400), None)
            .await
            .unwrap();
        assert!(transport
            .issued()
            .contains(&"input swipe 500 1600 500 400 300".to_string()));
    }
}
