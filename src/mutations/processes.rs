use log::{info, warn};

use super::types::{Fallback, Outcome};
use crate::command_channel::CommandChannel;
use crate::error_handling::types::{BridgeError, Rejection};
use crate::listing::ps_decoder::decode_owner_probe;
use crate::session_management::DeviceSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Terminate,
    Kill,
}

impl Signal {
    fn command(&self, pid: u32) -> String {
        match self {
            Signal::Terminate => format!("kill {} 2>&1", pid),
            Signal::Kill => format!("kill -9 {} 2>&1", pid),
        }
    }
}

/// Signals a process. When the shell user may not signal it, the owning
/// package (if the pid belongs to one) is force-stopped instead.
pub async fn signal(
    channel: &CommandChannel,
    session: &DeviceSession,
    pid: u32,
    signal: Signal,
) -> Result<Outcome, BridgeError> {
    let reply = channel.run_classified(session, &signal.command(pid)).await?;

    match reply.rejection {
        None => {
            info!("[{}] signalled pid {} ({:?})", session.serial(), pid, signal);
            Ok(Outcome::Success)
        }
        Some(Rejection::NoSuchProcess) => Ok(Outcome::rejected(
            Rejection::NoSuchProcess,
            format!("process {} not found", pid),
        )),
        Some(rejection) if rejection.is_privilege() => {
            stop_owning_package(channel, session, pid, signal, rejection).await
        }
        Some(rejection) => Ok(Outcome::rejected(
            rejection,
            format!("kill {}: {}", pid, reply.last_line()),
        )),
    }
}

async fn stop_owning_package(
    channel: &CommandChannel,
    session: &DeviceSession,
    pid: u32,
    signal: Signal,
    rejection: Rejection,
) -> Result<Outcome, BridgeError> {
    let probe = channel
        .run(session, &format!("ps -p {} -o NAME", pid))
        .await?;
    let Some(package) = decode_owner_probe(&probe) else {
        warn!(
            "[{}] not allowed to signal pid {} and it has no owning package",
            session.serial(),
            pid
        );
        return Ok(Outcome::rejected(
            rejection,
            format!("insufficient permissions to kill process {}", pid),
        ));
    };

    let reply = channel
        .run_classified(session, &format!("am force-stop {}", package))
        .await?;
    if let Some(stop_rejection) = reply.rejection {
        return Ok(Outcome::rejected(
            stop_rejection,
            format!("force-stop {}: {}", package, reply.last_line()),
        ));
    }
    if signal == Signal::Kill {
        channel
            .run_classified(session, &format!("am kill {}", package))
            .await?;
    }

    info!(
        "[{}] pid {} not signalable, force-stopped {}",
        session.serial(),
        pid,
        package
    );
    Ok(Outcome::FallbackApplied(Fallback::PackageForceStopped {
        pid,
        package,
    }))
}

pub async fn kill(
    channel: &CommandChannel,
    session: &DeviceSession,
    pid: u32,
) -> Result<Outcome, BridgeError> {
    signal(channel, session, pid, Signal::Terminate).await
}

pub async fn force_kill(
    channel: &CommandChannel,
    session: &DeviceSession,
    pid: u32,
) -> Result<Outcome, BridgeError> {
    signal(channel, session, pid, Signal::Kill).await
}
