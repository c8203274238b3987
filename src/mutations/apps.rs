use std::path::Path;

use log::{info, warn};

use super::types::Outcome;
use crate::batch_query::queries::require_package;
use crate::command_channel::CommandChannel;
use crate::error_handling::types::BridgeError;
use crate::session_management::DeviceSession;

pub async fn install(
    channel: &CommandChannel,
    session: &DeviceSession,
    apk: &Path,
) -> Result<Outcome, BridgeError> {
    if !tokio::fs::metadata(apk).await.map(|m| m.is_file()).unwrap_or(false) {
        return Ok(Outcome::failed(format!("{} does not exist", apk.display())));
    }
    let reply = channel.install(session, apk).await?;
    let outcome = Outcome::from_success_marker("install", &reply);
    log_outcome(session, "install", &apk.display().to_string(), &outcome);
    Ok(outcome)
}

pub async fn uninstall(
    channel: &CommandChannel,
    session: &DeviceSession,
    package: &str,
) -> Result<Outcome, BridgeError> {
    require_package(package)?;
    let reply = channel
        .run_classified(session, &format!("pm uninstall {}", package))
        .await?;
    let outcome = Outcome::from_success_marker("uninstall", &reply);
    log_outcome(session, "uninstall", package, &outcome);
    Ok(outcome)
}

/// Launches the package's launcher activity through `monkey`.
///
/// The success signal is approximate: monkey prints `Events injected` when it
/// fires the intent and `No activities found` when the package has no
/// launcher entry. Anything else is taken as started.
pub async fn start(
    channel: &CommandChannel,
    session: &DeviceSession,
    package: &str,
) -> Result<Outcome, BridgeError> {
    require_package(package)?;
    let reply = channel
        .run_classified(
            session,
            &format!(
                "monkey -p {} -c android.intent.category.LAUNCHER 1",
                package
            ),
        )
        .await?;
    let started = reply.contains("Events injected") || !reply.contains("No activities found");
    let outcome = if started {
        Outcome::Success
    } else {
        Outcome::failed(format!("start: {} has no launchable activity", package))
    };
    log_outcome(session, "start", package, &outcome);
    Ok(outcome)
}

pub async fn stop(
    channel: &CommandChannel,
    session: &DeviceSession,
    package: &str,
) -> Result<Outcome, BridgeError> {
    require_package(package)?;
    let reply = channel
        .run_classified(session, &format!("am force-stop {}", package))
        .await?;
    let outcome = Outcome::from_reply("stop", &reply);
    log_outcome(session, "stop", package, &outcome);
    Ok(outcome)
}

pub async fn clear_data(
    channel: &CommandChannel,
    session: &DeviceSession,
    package: &str,
) -> Result<Outcome, BridgeError> {
    require_package(package)?;
    let reply = channel
        .run_classified(session, &format!("pm clear {}", package))
        .await?;
    let outcome = Outcome::from_success_marker("clear", &reply);
    log_outcome(session, "clear", package, &outcome);
    Ok(outcome)
}

fn log_outcome(session: &DeviceSession, action: &str, subject: &str, outcome: &Outcome) {
    if outcome.is_success() {
        info!("[{}] {} {}: {}", session.serial(), action, subject, outcome);
    } else {
        warn!("[{}] {} {}: {}", session.serial(), action, subject, outcome);
    }
}
