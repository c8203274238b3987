use std::path::Path;
use std::process::{Output, Stdio};

use async_trait::async_trait;
use log::{debug, trace, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use super::transport_trait::Transport;
use super::types::{DeviceListing, HostOutput, LogSource};
use crate::configuration::types::AdbSettings;
use crate::error_handling::types::BridgeError;

/// [`Transport`] backed by the `adb` command-line client.
///
/// Every call spawns `adb -H <host> -P <port> [-s <serial>] ...`. Children are
/// spawned with `kill_on_drop`, so a timed-out call that drops its future
/// also terminates the client process.
#[derive(Debug, Clone)]
pub struct AdbCli {
    program: String,
    host: String,
    port: u16,
}

impl AdbCli {
    pub fn new(settings: &AdbSettings) -> Self {
        debug!(
            "Using adb client {} against server {}:{}",
            settings.path, settings.host, settings.port
        );
        AdbCli {
            program: settings.path.clone(),
            host: settings.host.clone(),
            port: settings.port,
        }
    }

    fn command(&self, serial: Option<&str>) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-H")
            .arg(&self.host)
            .arg("-P")
            .arg(self.port.to_string());
        if let Some(serial) = serial {
            cmd.arg("-s").arg(serial);
        }
        cmd.stdin(Stdio::null()).kill_on_drop(true);
        cmd
    }

    async fn output(&self, serial: Option<&str>, args: &[&str]) -> Result<Output, BridgeError> {
        trace!("adb {:?} {:?}", serial, args);
        self.command(serial)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                BridgeError::TransportUnavailable(format!("failed to run {}: {}", self.program, e))
            })
    }

    /// Host output that failed for a reason that is not the remote command's
    /// own doing.
    fn host_failure(serial: Option<&str>, output: &Output) -> Option<BridgeError> {
        if output.status.success() {
            return None;
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        classify_host_error(serial, &stderr)
    }

    async fn host_operation(
        &self,
        serial: Option<&str>,
        args: &[&str],
    ) -> Result<HostOutput, BridgeError> {
        let output = self.output(serial, args).await?;
        if let Some(err) = Self::host_failure(serial, &output) {
            return Err(err);
        }
        Ok(HostOutput::new(output.status.success(), combined_text(&output)))
    }
}

/// stdout followed by stderr, lossily decoded. Some vendor shells emit
/// invalid UTF-8.
fn combined_text(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&stderr);
    }
    text
}

/// Maps the client's own error text to a transport-level error.
pub(crate) fn classify_host_error(serial: Option<&str>, stderr: &str) -> Option<BridgeError> {
    let lower = stderr.to_lowercase();
    if lower.contains("cannot connect to daemon")
        || lower.contains("daemon not running")
        || lower.contains("failed to start daemon")
    {
        return Some(BridgeError::TransportUnavailable(stderr.trim().to_string()));
    }
    let serial = serial.unwrap_or_default().to_string();
    let device_missing = lower.contains("not found") && lower.contains("device '");
    if device_missing
        || lower.contains("device offline")
        || lower.contains("no devices/emulators found")
        || lower.contains("device unauthorized")
        || lower.contains("error: closed")
    {
        return Some(BridgeError::SessionLost(serial));
    }
    None
}

/// Decodes `adb devices` output, skipping the banner and daemon chatter.
pub(crate) fn decode_device_list(text: &str) -> Vec<DeviceListing> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('*') && !line.starts_with("List of"))
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let serial = parts.next()?;
            let state = parts.next()?;
            Some(DeviceListing::new(serial, state))
        })
        .collect()
}

#[async_trait]
impl Transport for AdbCli {
    async fn version(&self) -> Result<String, BridgeError> {
        let output = self.output(None, &["version"]).await?;
        if !output.status.success() {
            return Err(BridgeError::TransportUnavailable(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        let text = String::from_utf8_lossy(&output.stdout);
        Ok(text.lines().next().unwrap_or_default().trim().to_string())
    }

    async fn devices(&self) -> Result<Vec<DeviceListing>, BridgeError> {
        let output = self.output(None, &["devices"]).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_host_error(None, &stderr)
                .unwrap_or_else(|| BridgeError::TransportUnavailable(stderr.trim().to_string())));
        }
        Ok(decode_device_list(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn shell(&self, serial: &str, command: &str) -> Result<String, BridgeError> {
        let output = self.output(Some(serial), &["shell", command]).await?;
        if let Some(err) = Self::host_failure(Some(serial), &output) {
            warn!("[{}] shell transport failure: {}", serial, err);
            return Err(err);
        }
        Ok(combined_text(&output))
    }

    async fn push(
        &self,
        serial: &str,
        local: &Path,
        remote: &str,
    ) -> Result<HostOutput, BridgeError> {
        let local = local.to_string_lossy();
        self.host_operation(Some(serial), &["push", local.as_ref(), remote])
            .await
    }

    async fn pull(
        &self,
        serial: &str,
        remote: &str,
        local: &Path,
    ) -> Result<HostOutput, BridgeError> {
        let local = local.to_string_lossy();
        self.host_operation(Some(serial), &["pull", remote, local.as_ref()])
            .await
    }

    async fn install(&self, serial: &str, apk: &Path) -> Result<HostOutput, BridgeError> {
        let apk = apk.to_string_lossy();
        self.host_operation(Some(serial), &["install", apk.as_ref()]).await
    }

    async fn connect(&self, address: &str) -> Result<HostOutput, BridgeError> {
        self.host_operation(None, &["connect", address]).await
    }

    async fn disconnect(&self, address: &str) -> Result<HostOutput, BridgeError> {
        let output = self.output(None, &["disconnect", address]).await?;
        Ok(HostOutput::new(output.status.success(), combined_text(&output)))
    }

    async fn open_stream(&self, serial: &str, args: &[String]) -> Result<LogSource, BridgeError> {
        debug!("[{}] opening stream: adb {}", serial, args.join(" "));
        let mut child = self
            .command(Some(serial))
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                BridgeError::TransportUnavailable(format!("failed to run {}: {}", self.program, e))
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            BridgeError::TransportUnavailable("stream child has no stdout".to_string())
        })?;

        if let Some(stderr) = child.stderr.take() {
            let serial = serial.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!("[{}] stream stderr: {}", serial, line);
                }
            });
        }

        Ok(LogSource {
            reader: Box::new(stdout),
            child: Some(child),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_device_list() {
        let text = "\
* daemon not running; starting now at tcp:5037
* daemon started successfully
List of devices attached
emulator-5554\tdevice
192.168.1.20:5555\tdevice
R58M123ABC\tunauthorized
0123456789\toffline

";
        let devices = decode_device_list(text);
        assert_eq!(devices.len(), 4);
        assert_eq!(devices[0], DeviceListing::new("emulator-5554", "device"));
        assert!(devices[1].is_ready());
        assert!(!devices[2].is_ready());
        assert!(!devices[3].is_ready());
    }

    #[test]
    fn test_classify_host_error() {
        assert!(matches!(
            classify_host_error(Some("abc"), "adb: device 'abc' not found\n"),
            Some(BridgeError::SessionLost(s)) if s == "abc"
        ));
        assert!(matches!(
            classify_host_error(Some("abc"), "error: device offline"),
            Some(BridgeError::SessionLost(_))
        ));
        assert!(matches!(
            classify_host_error(None, "cannot connect to daemon at tcp:5037: Connection refused"),
            Some(BridgeError::TransportUnavailable(_))
        ));
        assert!(classify_host_error(Some("abc"), "ls: /x: No such file or directory").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_combined_text_appends_stderr() {
        use std::os::unix::process::ExitStatusExt;
        let output = Output {
            status: std::process::ExitStatus::from_raw(0),
            stdout: b"out".to_vec(),
            stderr: b"err\n".to_vec(),
        };
        assert_eq!(combined_text(&output), "out\nerr\n");
    }

    #[tokio::test]
    async fn test_missing_binary_is_transport_unavailable() {
        let cli = AdbCli::new(&AdbSettings {
            path: "/nonexistent/droidbridge-adb".to_string(),
            ..AdbSettings::default()
        });
        let err = cli.version().await.unwrap_err();
        assert!(matches!(err, BridgeError::TransportUnavailable(_)));
    }
}
