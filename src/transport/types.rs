use serde::Serialize;
use tokio::io::AsyncRead;
use tokio::process::Child;

/// One row of the daemon's device list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceListing {
    pub serial: String,
    /// `device`, `offline`, `unauthorized`, `recovery`, ...
    pub state: String,
}

impl DeviceListing {
    pub fn new(serial: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            state: state.into(),
        }
    }

    /// Only fully booted, authorized devices accept commands.
    pub fn is_ready(&self) -> bool {
        self.state == "device"
    }
}

/// Result of a host-side operation (push, pull, install, connect).
///
/// `success` is the host client's exit status; `text` is everything it
/// printed. Several of these report failure only in `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostOutput {
    pub success: bool,
    pub text: String,
}

impl HostOutput {
    pub fn new(success: bool, text: impl Into<String>) -> Self {
        Self {
            success,
            text: text.into(),
        }
    }
}

/// A long-lived line source, usually the stdout of a log-reading child.
///
/// Dropping the reader closes the pipe; the child, if any, is owned by
/// whoever ends the stream.
pub struct LogSource {
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
    pub child: Option<Child>,
}

impl LogSource {
    pub fn from_reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            child: None,
        }
    }
}

impl std::fmt::Debug for LogSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSource")
            .field("child", &self.child.as_ref().and_then(|c| c.id()))
            .finish_non_exhaustive()
    }
}
