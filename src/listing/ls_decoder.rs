use std::sync::OnceLock;

use regex::Regex;

use super::types::LsRow;
use crate::error_handling::types::DecodeIssue;

/// Long-format rows as printed by toybox and the older toolbox `ls`.
///
/// The hard-link column is absent on toolbox, and directories there carry no
/// size. Device nodes print `major, minor` in place of the size.
const LS_ROW_PATTERN: &str = r"^(?P<perm>[-bcdlps][-rwxsStT]{9}[.+@]?)\s+(?:\d+\s+)?(?P<owner>\S+)\s+(?P<group>\S+)\s+(?:(?P<size>\d+|\d+,\s*\d+)\s+)?(?P<date>\d{4}-\d{2}-\d{2}\s+\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:\s+[-+]\d{4})?)\s+(?P<name>.+)$";

static LS_ROW: OnceLock<Regex> = OnceLock::new();

fn ls_row_regex() -> &'static Regex {
    LS_ROW.get_or_init(|| Regex::new(LS_ROW_PATTERN).expect("ls row pattern is valid"))
}

/// Decodes one line of `ls -l` / `ls -ld` output.
///
/// `total N` summaries and blank lines come back as [`DecodeIssue::Skipped`].
/// Error text such as `ls: /x: No such file or directory` comes back as
/// [`DecodeIssue::Shape`]; classifying it is the caller's job.
pub fn decode_ls_line(line: &str) -> Result<LsRow, DecodeIssue> {
    let line = line.trim_end_matches(['\r', '\n']);
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with("total ") || trimmed == "total" {
        return Err(DecodeIssue::Skipped);
    }

    if let Some(caps) = ls_row_regex().captures(line) {
        let permissions = caps["perm"].to_string();
        let size = caps
            .name("size")
            .filter(|m| !m.as_str().contains(','))
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0);
        let (name, link_target) = split_link(&permissions, &caps["name"]);
        return Ok(LsRow {
            permissions,
            owner: caps["owner"].to_string(),
            group: Some(caps["group"].to_string()),
            size,
            modified: Some(collapse_spaces(&caps["date"])),
            name,
            link_target,
        });
    }

    decode_by_columns(trimmed)
}

/// Whitespace split for layouts the pattern does not know. Busybox prints
/// `Jan  1 10:00` (three date columns) where toybox prints two.
fn decode_by_columns(line: &str) -> Result<LsRow, DecodeIssue> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let looks_like_mode = parts
        .first()
        .map(|p| p.len() >= 10 && p.starts_with(['-', 'b', 'c', 'd', 'l', 'p', 's']))
        .unwrap_or(false);
    if !looks_like_mode {
        return Err(DecodeIssue::Shape(line.to_string()));
    }

    let date_columns = match parts.get(5) {
        Some(month) if month.chars().all(|c| c.is_ascii_alphabetic()) => 3,
        _ => 2,
    };
    let expected = 6 + date_columns;
    if parts.len() < expected {
        return Err(DecodeIssue::TooFewFields {
            expected,
            found: parts.len(),
        });
    }

    let permissions = parts[0].to_string();
    let size = parts[4].parse::<u64>().unwrap_or(0);
    let name_start = 5 + date_columns;
    let (name, link_target) = split_link(&permissions, &parts[name_start..].join(" "));
    Ok(LsRow {
        permissions,
        owner: parts[2].to_string(),
        group: Some(parts[3].to_string()),
        size,
        modified: Some(parts[5..name_start].join(" ")),
        name,
        link_target,
    })
}

fn split_link(permissions: &str, raw_name: &str) -> (String, Option<String>) {
    if permissions.starts_with('l') {
        if let Some((name, target)) = raw_name.split_once(" -> ") {
            return (name.to_string(), Some(target.to_string()));
        }
    }
    (raw_name.to_string(), None)
}

fn collapse_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toybox_file_row() {
        let row =
            decode_ls_line("-rw-rw---- 1 u0_a123 sdcard_rw 2048 2024-01-01 10:00 notes.txt")
                .unwrap();
        assert_eq!(row.name, "notes.txt");
        assert_eq!(row.size, 2048);
        assert_eq!(row.owner, "u0_a123");
        assert_eq!(row.group.as_deref(), Some("sdcard_rw"));
        assert_eq!(row.modified.as_deref(), Some("2024-01-01 10:00"));
        assert!(!row.is_directory());
    }

    #[test]
    fn test_symlink_row() {
        let row = decode_ls_line(
            "lrwxrwxrwx 1 root root 21 2024-01-01 10:00 sdcard -> /storage/self/primary",
        )
        .unwrap();
        assert!(row.is_symlink());
        assert_eq!(row.name, "sdcard");
        assert_eq!(row.link_target.as_deref(), Some("/storage/self/primary"));
    }

    #[test]
    fn test_toolbox_directory_without_size() {
        let row = decode_ls_line("drwxrwx--- root sdcard_r 2014-01-01 10:00 Alarms").unwrap();
        assert!(row.is_directory());
        assert_eq!(row.name, "Alarms");
        assert_eq!(row.size, 0);
        assert_eq!(row.owner, "root");
    }

    #[test]
    fn test_device_node_and_names_with_spaces() {
        let row = decode_ls_line("crw-rw-rw- 1 root root 1,   3 2024-01-01 10:00 null").unwrap();
        assert_eq!(row.name, "null");
        assert_eq!(row.size, 0);

        let row =
            decode_ls_line("-rw-rw---- 1 root sdcard_rw 10 2024-01-01 10:00 my holiday.jpg")
                .unwrap();
        assert_eq!(row.name, "my holiday.jpg");
    }

    #[test]
    fn test_selinux_marker_is_kept_in_permissions() {
        let row = decode_ls_line("drwxr-x--x. 3 root sdcard_rw 3452 2024-02-03 09:15 Android")
            .unwrap();
        assert_eq!(row.permissions, "drwxr-x--x.");
        assert!(row.is_directory());
    }

    #[test]
    fn test_column_fallback_for_month_dates() {
        let err = decode_ls_line("-rw-r--r-- 1 root root 123 Jan 1 song.mp3").unwrap_err();
        assert_eq!(
            err,
            DecodeIssue::TooFewFields {
                expected: 9,
                found: 8
            }
        );

        let row = decode_ls_line("-rw-r--r-- 1 root root 123 Jan  1 10:00 my song.mp3").unwrap();
        assert_eq!(row.name, "my song.mp3");
        assert_eq!(row.size, 123);
        assert_eq!(row.modified.as_deref(), Some("Jan 1 10:00"));
    }

    #[test]
    fn test_skipped_and_error_lines() {
        assert_eq!(decode_ls_line("total 24"), Err(DecodeIssue::Skipped));
        assert_eq!(decode_ls_line("   "), Err(DecodeIssue::Skipped));
        assert!(matches!(
            decode_ls_line("ls: /data: Permission denied"),
            Err(DecodeIssue::Shape(_))
        ));
    }
}
