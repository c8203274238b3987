use std::future::Future;
use std::path::Path;
use std::time::Duration;

use log::{debug, trace, warn};

use super::classifier::classify;
use crate::configuration::BridgeConfig;
use crate::error_handling::types::{BridgeError, Rejection};
use crate::session_management::session::DeviceSession;
use crate::transport::HostOutput;

/// Remote output together with the rejection it carries, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub rejection: Option<Rejection>,
    /// Host client exit status. Always true for shell commands, whose remote
    /// status is not reported.
    pub exit_ok: bool,
}

impl Reply {
    pub fn from_text(text: String) -> Self {
        let rejection = classify(&text);
        Reply {
            text,
            rejection,
            exit_ok: true,
        }
    }

    pub fn from_host(output: HostOutput) -> Self {
        let rejection = classify(&output.text);
        Reply {
            text: output.text,
            rejection,
            exit_ok: output.success,
        }
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.text.contains(needle)
    }

    pub fn is_clean(&self) -> bool {
        self.exit_ok && self.rejection.is_none()
    }

    /// Last non-empty line, used as a short failure reason.
    pub fn last_line(&self) -> &str {
        self.text
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or_default()
    }
}

/// Runs commands against a session: one at a time per device, bounded by a
/// timeout, and refusing sessions that were evicted.
#[derive(Debug, Clone)]
pub struct CommandChannel {
    command_timeout: Duration,
    transfer_timeout: Duration,
}

impl CommandChannel {
    pub fn new(command_timeout: Duration, transfer_timeout: Duration) -> Self {
        CommandChannel {
            command_timeout,
            transfer_timeout,
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.command_timeout(), config.transfer_timeout())
    }

    /// Issues one shell command and returns its combined output.
    pub async fn run(&self, session: &DeviceSession, command_line: &str) -> Result<String, BridgeError> {
        let _guard = session.lock_commands().await;
        let transport = session.transport()?;
        trace!("[{}] $ {}", session.serial(), command_line);

        let text = bounded(
            self.command_timeout,
            command_line,
            transport.shell(session.serial(), command_line),
        )
        .await?;

        // evicted while the command was in flight
        if !session.is_live() {
            return Err(BridgeError::SessionLost(session.serial().to_string()));
        }
        Ok(text)
    }

    pub async fn run_classified(
        &self,
        session: &DeviceSession,
        command_line: &str,
    ) -> Result<Reply, BridgeError> {
        let reply = Reply::from_text(self.run(session, command_line).await?);
        if let Some(rejection) = reply.rejection {
            debug!(
                "[{}] `{}` rejected: {}",
                session.serial(),
                command_line,
                rejection
            );
        }
        Ok(reply)
    }

    pub async fn push(
        &self,
        session: &DeviceSession,
        local: &Path,
        remote: &str,
    ) -> Result<Reply, BridgeError> {
        let _guard = session.lock_commands().await;
        let transport = session.transport()?;
        let label = format!("push {} {}", local.display(), remote);
        let output = bounded(
            self.transfer_timeout,
            &label,
            transport.push(session.serial(), local, remote),
        )
        .await?;
        self.finish_host(session, &label, output)
    }

    pub async fn pull(
        &self,
        session: &DeviceSession,
        remote: &str,
        local: &Path,
    ) -> Result<Reply, BridgeError> {
        let _guard = session.lock_commands().await;
        let transport = session.transport()?;
        let label = format!("pull {} {}", remote, local.display());
        let output = bounded(
            self.transfer_timeout,
            &label,
            transport.pull(session.serial(), remote, local),
        )
        .await?;
        self.finish_host(session, &label, output)
    }

    pub async fn install(&self, session: &DeviceSession, apk: &Path) -> Result<Reply, BridgeError> {
        let _guard = session.lock_commands().await;
        let transport = session.transport()?;
        let label = format!("install {}", apk.display());
        let output = bounded(
            self.transfer_timeout,
            &label,
            transport.install(session.serial(), apk),
        )
        .await?;
        self.finish_host(session, &label, output)
    }

    fn finish_host(
        &self,
        session: &DeviceSession,
        label: &str,
        output: HostOutput,
    ) -> Result<Reply, BridgeError> {
        if !session.is_live() {
            return Err(BridgeError::SessionLost(session.serial().to_string()));
        }
        let reply = Reply::from_host(output);
        if !reply.is_clean() {
            debug!("[{}] `{}` failed: {}", session.serial(), label, reply.last_line());
        }
        Ok(reply)
    }
}

async fn bounded<T, F>(limit: Duration, label: &str, fut: F) -> Result<T, BridgeError>
where
    F: Future<Output = Result<T, BridgeError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!("`{}` timed out after {:?}", label, limit);
            Err(BridgeError::TimedOut(label.to_string()))
        }
    }
}

/// Wraps a remote path in single quotes for the device shell, turning
/// embedded quotes into `'\''` and backslashes into `/`.
pub fn shell_quote(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    format!("'{}'", normalized.replace('\'', r"'\''"))
}
