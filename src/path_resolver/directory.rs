use log::{debug, info};
use serde::Serialize;

use super::resolver::{join_remote, normalize_display_path, PathResolver};
use crate::command_channel::classifier::classify;
use crate::command_channel::{shell_quote, CommandChannel};
use crate::error_handling::types::{BridgeError, DecodeIssue, Rejection};
use crate::listing::ls_decoder::decode_ls_line;
use crate::listing::types::{FileEntry, LsRow};
use crate::session_management::DeviceSession;

/// Result of listing one remote directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryListing {
    /// The path as the caller asked for it.
    pub display_path: String,
    /// The path the listing actually ran against, after following symlinks.
    pub actual_path: String,
    pub entries: Vec<FileEntry>,
    /// Set when the remote refused the listing and nothing was decoded.
    pub rejection: Option<Rejection>,
    /// Lines that could not be decoded.
    pub skipped: usize,
}

pub fn listing_command(actual_path: &str, show_hidden: bool) -> String {
    let flags = if show_hidden { "-la" } else { "-l" };
    format!("ls {} {} 2>&1", flags, shell_quote(actual_path))
}

fn directory_probe_command(actual_path: &str) -> String {
    format!("test -d {} && echo 1 || echo 0", shell_quote(actual_path))
}

/// Lists a directory, reporting every entry under the caller's display path.
///
/// Symlinked entries are probed so that links to directories are reported as
/// directories. Entries come back directories first, then by name ignoring
/// case.
pub async fn list_directory(
    channel: &CommandChannel,
    resolver: &PathResolver,
    session: &DeviceSession,
    display_path: &str,
    show_hidden: bool,
) -> Result<DirectoryListing, BridgeError> {
    let display_path = normalize_display_path(display_path);
    let actual_path = resolver.resolve(channel, session, &display_path).await?;
    if actual_path != display_path.trim_end_matches('/') {
        debug!(
            "[{}] listing {} via {}",
            session.serial(),
            display_path,
            actual_path
        );
    }

    let text = channel
        .run(session, &listing_command(&actual_path, show_hidden))
        .await?;

    let mut entries = Vec::new();
    let mut rejection = None;
    let mut skipped = 0;

    for line in text.lines() {
        let row = match decode_ls_line(line) {
            Ok(row) => row,
            Err(DecodeIssue::Skipped) => continue,
            Err(issue) => {
                match classify(line) {
                    Some(r) => {
                        rejection.get_or_insert(r);
                    }
                    None => {
                        debug!("[{}] undecodable ls line: {}", session.serial(), issue);
                        skipped += 1;
                    }
                }
                continue;
            }
        };

        if row.name == "." || row.name == ".." {
            continue;
        }
        if !show_hidden && row.name.starts_with('.') {
            continue;
        }

        let mut entry = to_entry(row, &display_path);
        if entry.is_symlink {
            let child = join_remote(&actual_path, &entry.name);
            let probe = channel.run(session, &directory_probe_command(&child)).await?;
            entry.is_directory = probe.trim() == "1";
        }
        entries.push(entry);
    }

    sort_entries(&mut entries);

    // a rejection only stands for the whole listing when nothing decoded
    let rejection = if entries.is_empty() { rejection } else { None };
    if let Some(r) = rejection {
        info!("[{}] listing {} rejected: {}", session.serial(), display_path, r);
    }

    Ok(DirectoryListing {
        display_path,
        actual_path,
        entries,
        rejection,
        skipped,
    })
}

fn to_entry(row: LsRow, display_base: &str) -> FileEntry {
    // `ls -l <file>` prints the file under the full path it was given
    let (path, name) = if row.name.starts_with('/') {
        let base = row.name.rsplit('/').next().unwrap_or_default().to_string();
        (display_base.to_string(), base)
    } else {
        (join_remote(display_base, &row.name), row.name.clone())
    };
    FileEntry {
        path,
        is_directory: row.is_directory(),
        is_symlink: row.is_symlink(),
        name,
        size: row.size,
        permissions: row.permissions,
        owner: row.owner,
        group: row.group,
        modified: row.modified,
        link_target: row.link_target,
    }
}

pub fn sort_entries(entries: &mut [FileEntry]) {
    entries.sort_by(|a, b| {
        b.is_directory
            .cmp(&a.is_directory)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
}
