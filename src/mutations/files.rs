use std::path::Path;

use log::{info, warn};

use super::types::{Fallback, Outcome};
use crate::command_channel::{shell_quote, CommandChannel};
use crate::error_handling::types::BridgeError;
use crate::path_resolver::resolver::normalize_lexically;
use crate::path_resolver::{join_remote, normalize_display_path};
use crate::session_management::DeviceSession;

/// Uploads `local` to `remote`. When the device refuses the write, the file
/// is uploaded once more into `fallback_dir` under its own name.
pub async fn push(
    channel: &CommandChannel,
    session: &DeviceSession,
    local: &Path,
    remote: &str,
    fallback_dir: &str,
) -> Result<Outcome, BridgeError> {
    if !tokio::fs::metadata(local).await.map(|m| m.is_file()).unwrap_or(false) {
        return Ok(Outcome::failed(format!(
            "local file {} does not exist",
            local.display()
        )));
    }

    let remote = normalize_display_path(remote);
    let first = channel.push(session, local, &remote).await?;
    if first.is_clean() {
        info!("[{}] pushed {} to {}", session.serial(), local.display(), remote);
        return Ok(Outcome::Success);
    }
    warn!(
        "[{}] push to {} failed: {}",
        session.serial(),
        remote,
        first.last_line()
    );

    let file_name = match local.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => return Ok(Outcome::from_reply("push", &first)),
    };
    let fallback = join_remote(fallback_dir, &file_name);
    if fallback == remote {
        return Ok(Outcome::from_reply("push", &first));
    }

    let second = channel.push(session, local, &fallback).await?;
    if second.is_clean() {
        info!(
            "[{}] pushed {} to fallback {}",
            session.serial(),
            local.display(),
            fallback
        );
        Ok(Outcome::FallbackApplied(Fallback::UploadRedirected {
            requested: remote,
            actual: fallback,
        }))
    } else {
        Ok(Outcome::from_reply("push", &second))
    }
}

pub async fn pull(
    channel: &CommandChannel,
    session: &DeviceSession,
    remote: &str,
    local: &Path,
) -> Result<Outcome, BridgeError> {
    let remote = normalize_display_path(remote);
    let reply = channel.pull(session, &remote, local).await?;
    let outcome = Outcome::from_reply("pull", &reply);
    if outcome.is_success() {
        info!("[{}] pulled {} to {}", session.serial(), remote, local.display());
    }
    Ok(outcome)
}

pub async fn delete(
    channel: &CommandChannel,
    session: &DeviceSession,
    path: &str,
    is_directory: bool,
) -> Result<Outcome, BridgeError> {
    let path = normalize_display_path(path);
    if normalize_lexically(&path) == "/" {
        return Err(BridgeError::InvalidOperation(
            "refusing to delete the root directory".to_string(),
        ));
    }
    let command = if is_directory {
        format!("rm -r {}", shell_quote(&path))
    } else {
        format!("rm {}", shell_quote(&path))
    };
    let reply = channel.run_classified(session, &command).await?;
    Ok(Outcome::from_reply("delete", &reply))
}

pub async fn rename(
    channel: &CommandChannel,
    session: &DeviceSession,
    from: &str,
    to: &str,
) -> Result<Outcome, BridgeError> {
    let command = format!(
        "mv {} {}",
        shell_quote(&normalize_display_path(from)),
        shell_quote(&normalize_display_path(to))
    );
    let reply = channel.run_classified(session, &command).await?;
    Ok(Outcome::from_reply("rename", &reply))
}

pub async fn make_directory(
    channel: &CommandChannel,
    session: &DeviceSession,
    path: &str,
) -> Result<Outcome, BridgeError> {
    let command = format!("mkdir -p {}", shell_quote(&normalize_display_path(path)));
    let reply = channel.run_classified(session, &command).await?;
    Ok(Outcome::from_reply("mkdir", &reply))
}
