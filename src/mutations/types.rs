use std::fmt;

use serde::Serialize;

use crate::command_channel::Reply;
use crate::error_handling::types::Rejection;

/// A recovery path that was taken after the direct attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Fallback {
    /// The push to the requested path failed; the file went here instead.
    UploadRedirected { requested: String, actual: String },
    /// Signalling the pid was refused; the package owning it was stopped.
    PackageForceStopped { pid: u32, package: String },
}

impl fmt::Display for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fallback::UploadRedirected { requested, actual } => {
                write!(f, "could not write {}, uploaded to {} instead", requested, actual)
            }
            Fallback::PackageForceStopped { pid, package } => {
                write!(f, "could not signal pid {}, force-stopped {}", pid, package)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub reason: String,
    pub rejection: Option<Rejection>,
}

/// How a mutating operation ended. Transport failures are not outcomes; they
/// surface as `Err(BridgeError)` instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Success,
    FallbackApplied(Fallback),
    Failed(Failure),
}

impl Outcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        Outcome::Failed(Failure {
            reason: reason.into(),
            rejection: None,
        })
    }

    pub fn rejected(rejection: Rejection, reason: impl Into<String>) -> Self {
        Outcome::Failed(Failure {
            reason: reason.into(),
            rejection: Some(rejection),
        })
    }

    /// Success from a shell reply: anything the classifier recognises fails.
    pub fn from_reply(action: &str, reply: &Reply) -> Self {
        match reply.rejection {
            Some(rejection) => Outcome::rejected(
                rejection,
                format!("{}: {}", action, reply.last_line()),
            ),
            None if !reply.exit_ok => Outcome::failed(format!("{}: {}", action, reply.last_line())),
            None => Outcome::Success,
        }
    }

    /// Package-manager style replies that print `Success` when they succeed.
    pub fn from_success_marker(action: &str, reply: &Reply) -> Self {
        if reply.contains("Success") {
            Outcome::Success
        } else {
            let failure = reply
                .text
                .lines()
                .map(str::trim)
                .find(|l| l.contains("Failure") || l.contains("Error"))
                .unwrap_or_else(|| reply.last_line());
            Outcome::Failed(Failure {
                reason: format!("{}: {}", action, failure),
                rejection: reply.rejection,
            })
        }
    }

    /// True for both clean success and success through a fallback.
    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::Failed(_))
    }

    pub fn fallback(&self) -> Option<&Fallback> {
        match self {
            Outcome::FallbackApplied(fallback) => Some(fallback),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Outcome::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => write!(f, "ok"),
            Outcome::FallbackApplied(fallback) => write!(f, "ok ({})", fallback),
            Outcome::Failed(failure) => write!(f, "failed: {}", failure.reason),
        }
    }
}
