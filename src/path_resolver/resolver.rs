use std::collections::HashSet;

use log::{debug, warn};

use crate::command_channel::{shell_quote, CommandChannel};
use crate::error_handling::types::BridgeError;
use crate::listing::ls_decoder::decode_ls_line;
use crate::session_management::DeviceSession;

/// Follows symlinks on the device so a directory can be listed through a
/// link (`/sdcard` -> `/storage/self/primary` -> `/storage/emulated/0`).
///
/// Resolution stops at the first path that is not a symlink, after
/// `max_hops` hops, or when a path repeats. It never fails on a cycle; the
/// last path reached is returned.
#[derive(Debug, Clone)]
pub struct PathResolver {
    max_hops: usize,
}

impl PathResolver {
    pub fn new(max_hops: usize) -> Self {
        PathResolver { max_hops }
    }

    pub async fn resolve(
        &self,
        channel: &CommandChannel,
        session: &DeviceSession,
        path: &str,
    ) -> Result<String, BridgeError> {
        let mut current = trim_trailing_slash(&normalize_display_path(path));
        let mut visited = HashSet::new();
        visited.insert(current.clone());

        for _ in 0..self.max_hops {
            let text = channel
                .run(session, &format!("ls -ld {} 2>/dev/null", shell_quote(&current)))
                .await?;
            let Some(target) = link_target(&text) else {
                break;
            };

            let next = absolutize(&current, &target);
            if !visited.insert(next.clone()) {
                warn!(
                    "[{}] symlink cycle at {} -> {}, stopping",
                    session.serial(),
                    current,
                    next
                );
                break;
            }
            debug!("[{}] {} -> {}", session.serial(), current, next);
            current = next;
        }

        Ok(current)
    }
}

fn link_target(ls_output: &str) -> Option<String> {
    let line = ls_output.lines().find(|l| !l.trim().is_empty())?;
    let row = decode_ls_line(line).ok()?;
    if row.is_symlink() {
        row.link_target
    } else {
        None
    }
}

/// Backslashes become `/`; an empty path means the root.
pub fn normalize_display_path(path: &str) -> String {
    let path = path.trim().replace('\\', "/");
    if path.is_empty() {
        "/".to_string()
    } else {
        path
    }
}

fn trim_trailing_slash(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Child path under a directory, with exactly one separator.
pub fn join_remote(base: &str, name: &str) -> String {
    if base.ends_with('/') {
        format!("{}{}", base, name)
    } else {
        format!("{}/{}", base, name)
    }
}

pub fn parent_of(path: &str) -> String {
    let trimmed = trim_trailing_slash(path);
    match trimmed.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(i) => trimmed[..i].to_string(),
    }
}

/// A link target made absolute against the link's directory, with `.` and
/// `..` folded lexically.
pub fn absolutize(link_path: &str, target: &str) -> String {
    if target.starts_with('/') {
        normalize_lexically(target)
    } else {
        normalize_lexically(&join_remote(&parent_of(link_path), target))
    }
}

pub fn normalize_lexically(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    format!("/{}", parts.join("/"))
}
