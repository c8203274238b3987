//! Pure decoders from remote command text to typed records.
//!
//! Nothing in here talks to a device; every function takes the text a command
//! produced and returns records or a [`crate::error_handling::DecodeIssue`].

pub mod logcat_decoder;
pub mod ls_decoder;
pub mod package_decoder;
pub mod property_decoder;
pub mod ps_decoder;
pub mod types;

pub use types::{AppEntry, FileEntry, LogEntry, LogRecord, LsRow, PackageDetails, ProcessEntry, Severity};
