use std::fmt;

use serde::Serialize;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    NotInRange(String),
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
            ConfigError::InvalidValue(e) => write!(f, "Invalid value: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

/// Conditions the remote shell reports as English text inside otherwise
/// successful output.
///
/// The remote side exits with status 0 for most of these, so they can only be
/// recognised by substring inspection (see [`crate::command_channel::classifier`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Rejection {
    /// `No such file`
    NotFound,
    /// `Permission denied`
    PermissionDenied,
    /// `No such process`
    NoSuchProcess,
    /// `Operation not permitted`
    OperationNotPermitted,
}

impl Rejection {
    /// True for the two rejections caused by insufficient privilege.
    pub fn is_privilege(&self) -> bool {
        matches!(
            self,
            Rejection::PermissionDenied | Rejection::OperationNotPermitted
        )
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NotFound => write!(f, "not found"),
            Rejection::PermissionDenied => write!(f, "permission denied"),
            Rejection::NoSuchProcess => write!(f, "no such process"),
            Rejection::OperationNotPermitted => write!(f, "operation not permitted"),
        }
    }
}

/// Why a single line of listing or log output could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeIssue {
    /// Blank lines, `total N` summaries, column headers.
    Skipped,
    /// The line has fewer fields than the record needs.
    TooFewFields { expected: usize, found: usize },
    /// A numeric field held something else.
    BadNumber { field: &'static str, value: String },
    /// The line does not match the record's shape at all.
    Shape(String),
}

impl fmt::Display for DecodeIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeIssue::Skipped => write!(f, "line skipped"),
            DecodeIssue::TooFewFields { expected, found } => {
                write!(f, "expected at least {} fields, found {}", expected, found)
            }
            DecodeIssue::BadNumber { field, value } => {
                write!(f, "field {} is not a number: {:?}", field, value)
            }
            DecodeIssue::Shape(line) => write!(f, "unexpected line shape: {:?}", line),
        }
    }
}

#[derive(Debug)]
pub enum BridgeError {
    /// The serial is no longer resolvable or its transport handle was evicted.
    SessionLost(String),
    /// The debug-bridge daemon itself cannot be reached.
    TransportUnavailable(String),
    /// A command did not complete within the configured timeout.
    TimedOut(String),
    RemoteRejected(Rejection),
    Unparsable(DecodeIssue),
    InvalidOperation(String),
    StreamAlreadyActive(String),
    Io(std::io::Error),
}

impl BridgeError {
    /// Transport-level failures are the ones that propagate to callers as errors.
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            BridgeError::SessionLost(_)
                | BridgeError::TransportUnavailable(_)
                | BridgeError::TimedOut(_)
        )
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::SessionLost(serial) => write!(f, "Session lost for device {}", serial),
            BridgeError::TransportUnavailable(e) => write!(f, "Transport unavailable: {}", e),
            BridgeError::TimedOut(cmd) => write!(f, "Command timed out: {}", cmd),
            BridgeError::RemoteRejected(r) => write!(f, "Remote rejected the command: {}", r),
            BridgeError::Unparsable(issue) => write!(f, "Unparsable output: {}", issue),
            BridgeError::InvalidOperation(e) => write!(f, "Invalid operation: {}", e),
            BridgeError::StreamAlreadyActive(serial) => {
                write!(f, "A log stream is already active for device {}", serial)
            }
            BridgeError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for BridgeError {}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::Io(err)
    }
}

impl From<DecodeIssue> for BridgeError {
    fn from(issue: DecodeIssue) -> Self {
        BridgeError::Unparsable(issue)
    }
}
