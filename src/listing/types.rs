//! Typed records produced from the remote shell's text output.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// One decoded row of `ls -l` output, before any display-path rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LsRow {
    pub permissions: String,
    pub owner: String,
    pub group: Option<String>,
    pub size: u64,
    pub modified: Option<String>,
    pub name: String,
    pub link_target: Option<String>,
}

impl LsRow {
    pub fn is_symlink(&self) -> bool {
        self.permissions.starts_with('l')
    }

    pub fn is_directory(&self) -> bool {
        self.permissions.starts_with('d')
    }
}

/// A remote filesystem entry as shown to callers.
///
/// `path` is always composed from the caller's display path, never from the
/// symlink-resolved path the listing was actually performed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub permissions: String,
    pub is_directory: bool,
    pub is_symlink: bool,
    pub owner: String,
    pub group: Option<String>,
    pub modified: Option<String>,
    pub link_target: Option<String>,
}

impl FileEntry {
    /// Human readable size (`512 B`, `1.5 KB`, `2.25 MB`, ...).
    pub fn size_formatted(&self) -> String {
        const KB: f64 = 1024.0;
        let size = self.size as f64;
        if size < KB {
            format!("{} B", self.size)
        } else if size < KB * KB {
            format!("{} KB", round2(size / KB))
        } else if size < KB * KB * KB {
            format!("{} MB", round2(size / (KB * KB)))
        } else {
            format!("{} GB", round2(size / (KB * KB * KB)))
        }
    }

    /// `Folder`, `Link`, `<EXT> File` or `File`.
    pub fn file_type(&self) -> String {
        if self.is_directory {
            return "Folder".to_string();
        }
        if self.is_symlink {
            return "Link".to_string();
        }
        match self.name.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => format!("{} File", ext.to_uppercase()),
            _ => "File".to_string(),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One row of the process table. Snapshots are full replacements, never diffs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
    pub user: String,
    /// Memory column reported by the process table, in KB.
    pub memory_kb: u64,
    /// First character of the STAT column.
    pub state: char,
}

impl ProcessEntry {
    pub fn memory_mb(&self) -> f64 {
        round2(self.memory_kb as f64 / 1024.0)
    }

    pub fn state_text(&self) -> &'static str {
        match self.state {
            'R' => "Running",
            'S' => "Sleeping",
            'D' => "Disk Sleep",
            'Z' => "Zombie",
            'T' => "Stopped",
            'W' => "Paging",
            _ => "Unknown",
        }
    }
}

/// Version and state fields pulled out of `dumpsys package <pkg>`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PackageDetails {
    pub version: Option<String>,
    pub version_code: Option<String>,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppEntry {
    pub package_name: String,
    /// Derived from the package name; not the label the launcher shows.
    pub display_name: String,
    pub version: String,
    pub version_code: String,
    pub is_system: bool,
    pub is_running: bool,
    pub is_enabled: bool,
}

impl AppEntry {
    pub fn app_type(&self) -> &'static str {
        if self.is_system {
            "System"
        } else {
            "User"
        }
    }

    pub fn status(&self) -> &'static str {
        if self.is_running {
            "Running"
        } else {
            "Not Running"
        }
    }
}

/// Log severities in increasing order, so a floor compares with `>=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Verbose,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Severity {
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'V' => Some(Severity::Verbose),
            'D' => Some(Severity::Debug),
            'I' => Some(Severity::Info),
            'W' => Some(Severity::Warn),
            'E' => Some(Severity::Error),
            // assert-level lines are reported as fatal
            'F' | 'A' => Some(Severity::Fatal),
            _ => None,
        }
    }

    pub fn letter(&self) -> char {
        match self {
            Severity::Verbose => 'V',
            Severity::Debug => 'D',
            Severity::Info => 'I',
            Severity::Warn => 'W',
            Severity::Error => 'E',
            Severity::Fatal => 'F',
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Verbose => "Verbose",
            Severity::Debug => "Debug",
            Severity::Info => "Info",
            Severity::Warn => "Warning",
            Severity::Error => "Error",
            Severity::Fatal => "Fatal",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Severity::from_letter(c).ok_or_else(|| format!("unknown severity {:?}", s));
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "verbose" => Ok(Severity::Verbose),
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warn" | "warning" => Ok(Severity::Warn),
            "error" => Ok(Severity::Error),
            "fatal" | "assert" => Ok(Severity::Fatal),
            _ => Err(format!("unknown severity {:?}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub pid: u32,
    /// Only the `threadtime` format carries a thread id.
    pub tid: Option<u32>,
    pub severity: Severity,
    pub tag: String,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}/{}: {}",
            self.timestamp, self.severity, self.tag, self.message
        )
    }
}

/// A line of the continuous log feed. Lines that do not match the expected
/// shape are still delivered, as `Raw`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LogRecord {
    Entry(LogEntry),
    Raw(String),
}

impl LogRecord {
    pub fn entry(&self) -> Option<&LogEntry> {
        match self {
            LogRecord::Entry(entry) => Some(entry),
            LogRecord::Raw(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, size: u64, permissions: &str) -> FileEntry {
        FileEntry {
            name: name.to_string(),
            path: format!("/sdcard/{}", name),
            size,
            permissions: permissions.to_string(),
            is_directory: permissions.starts_with('d'),
            is_symlink: permissions.starts_with('l'),
            owner: "root".to_string(),
            group: None,
            modified: None,
            link_target: None,
        }
    }

    #[test]
    fn test_size_formatted() {
        assert_eq!(entry("a", 512, "-rw-------").size_formatted(), "512 B");
        assert_eq!(entry("a", 1536, "-rw-------").size_formatted(), "1.5 KB");
        assert_eq!(
            entry("a", 3 * 1024 * 1024, "-rw-------").size_formatted(),
            "3 MB"
        );
    }

    #[test]
    fn test_file_type() {
        assert_eq!(entry("notes.txt", 1, "-rw-------").file_type(), "TXT File");
        assert_eq!(entry("Music", 1, "drwxrwx---").file_type(), "Folder");
        assert_eq!(entry("sdcard", 1, "lrwxrwxrwx").file_type(), "Link");
        assert_eq!(entry("Makefile", 1, "-rw-------").file_type(), "File");
    }

    #[test]
    fn test_severity_ordering_and_parsing() {
        assert!(Severity::Error > Severity::Warn);
        assert!(Severity::Verbose < Severity::Debug);
        assert_eq!("w".parse::<Severity>().unwrap(), Severity::Warn);
        assert_eq!("error".parse::<Severity>().unwrap(), Severity::Error);
        assert_eq!(Severity::from_letter('A'), Some(Severity::Fatal));
        assert!("x".parse::<Severity>().is_err());
    }

    #[test]
    fn test_process_state_text() {
        let process = ProcessEntry {
            pid: 1,
            name: "init".into(),
            user: "root".into(),
            memory_kb: 2048,
            state: 'S',
        };
        assert_eq!(process.state_text(), "Sleeping");
        assert_eq!(process.memory_mb(), 2.0);
    }
}
