use std::collections::HashSet;

use log::debug;

use super::package_decoder::is_valid_package_name;
use super::types::ProcessEntry;
use crate::error_handling::types::DecodeIssue;

/// Decodes one row of `ps -A -o PID,USER,VSZ,STAT,NAME`.
pub fn decode_ps_row(line: &str) -> Result<ProcessEntry, DecodeIssue> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.is_empty() || parts[0] == "PID" {
        return Err(DecodeIssue::Skipped);
    }
    if parts.len() < 5 {
        return Err(DecodeIssue::TooFewFields {
            expected: 5,
            found: parts.len(),
        });
    }

    let pid = parts[0].parse::<u32>().map_err(|_| DecodeIssue::BadNumber {
        field: "pid",
        value: parts[0].to_string(),
    })?;

    Ok(ProcessEntry {
        pid,
        user: parts[1].to_string(),
        memory_kb: parts[2].parse::<u64>().unwrap_or(0),
        state: parts[3].chars().next().unwrap_or('?'),
        name: parts[4..].join(" "),
    })
}

/// Decodes a whole process table, dropping rows that do not decode.
pub fn decode_process_table(text: &str) -> Vec<ProcessEntry> {
    let mut processes = Vec::new();
    for line in text.lines() {
        match decode_ps_row(line) {
            Ok(process) => processes.push(process),
            Err(DecodeIssue::Skipped) => {}
            Err(issue) => debug!("Dropping process row {:?}: {}", line, issue),
        }
    }
    processes
}

/// Extracts application-like names from a bare `ps` / `ps -A` listing.
///
/// Only the last column is considered, and only when it looks like a package
/// (contains a `.` and is not a filesystem path). The first line is the
/// header. The result approximates the set of running applications; it is
/// not an authoritative answer.
pub fn decode_running_tokens(text: &str) -> HashSet<String> {
    text.lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().last())
        .filter(|token| token.contains('.') && !token.starts_with('/'))
        .map(|token| token.to_string())
        .collect()
}

/// Pids printed by `pidof`. Empty output means nothing is running.
pub fn decode_pidof(text: &str) -> Vec<u32> {
    text.split_whitespace()
        .filter_map(|token| token.parse::<u32>().ok())
        .collect()
}

/// The owning package reported by `ps -p <pid> -o NAME`: the row after the
/// header with any `:service` suffix dropped, accepted only when the rest is
/// a valid package name.
pub fn decode_owner_probe(text: &str) -> Option<String> {
    let name = text.lines().nth(1)?.trim();
    let package = name.split(':').next().unwrap_or(name);
    if package.contains('.') && is_valid_package_name(package) {
        Some(package.to_string())
    } else {
        None
    }
}
