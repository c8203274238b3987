use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use super::types::{StreamFilter, StreamState};
use crate::configuration::BridgeConfig;
use crate::error_handling::types::BridgeError;
use crate::listing::logcat_decoder::decode_record;
use crate::listing::types::LogRecord;
use crate::session_management::DeviceSession;

/// Starts continuous log streams.
///
/// A stream runs as two tasks: a reader that decodes lines and hands them to
/// a bounded queue, and a dispatcher that invokes the consumer's callback.
/// Stopping is cooperative first and forced after the grace period.
#[derive(Debug, Clone)]
pub struct LogStreamer {
    grace: Duration,
    buffer: usize,
}

impl LogStreamer {
    pub fn new(grace: Duration, buffer: usize) -> Self {
        LogStreamer {
            grace,
            buffer: buffer.max(1),
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.stream_grace(), config.stream.buffer)
    }

    /// Opens the device's log feed and delivers every line to `on_record`,
    /// in order, until the returned handle is stopped or dropped.
    ///
    /// Only one stream may be active per session.
    pub async fn start<F>(
        &self,
        session: Arc<DeviceSession>,
        filter: StreamFilter,
        on_record: F,
    ) -> Result<StreamHandle, BridgeError>
    where
        F: FnMut(LogRecord) + Send + 'static,
    {
        if !session.try_begin_stream() {
            return Err(BridgeError::StreamAlreadyActive(session.serial().to_string()));
        }

        let opened = match session.transport() {
            Ok(transport) => transport.open_stream(session.serial(), &filter.to_args()).await,
            Err(e) => Err(e),
        };
        let source = match opened {
            Ok(source) => source,
            Err(e) => {
                session.end_stream();
                return Err(e);
            }
        };

        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.buffer);
        let (stop_tx, stop_rx) = watch::channel(false);
        let stopping = Arc::new(AtomicBool::new(false));

        let reader = tokio::spawn(read_lines(
            session.serial().to_string(),
            source.reader,
            tx,
            stop_rx,
        ));
        let dispatcher = tokio::spawn(dispatch(rx, Arc::clone(&stopping), on_record));

        info!(
            "[{}] log stream {} started ({})",
            session.serial(),
            id,
            filter.to_args().join(" ")
        );

        Ok(StreamHandle {
            id,
            session,
            filter,
            state: StreamState::Streaming,
            grace: self.grace,
            stopping,
            stop_tx,
            reader: Some(reader),
            dispatcher: Some(dispatcher),
            child: source.child,
        })
    }
}

async fn read_lines(
    serial: String,
    source: Box<dyn AsyncRead + Send + Unpin>,
    tx: mpsc::Sender<LogRecord>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut reader = BufReader::new(source);
    let mut buf = Vec::new();
    loop {
        let read = tokio::select! {
            biased;
            _ = stop_rx.changed() => break,
            read = reader.read_until(b'\n', &mut buf) => read,
        };
        match read {
            Ok(0) => {
                debug!("[{}] log stream reached end of output", serial);
                break;
            }
            Ok(_) => {
                // vendor logs are not always valid UTF-8
                let line = String::from_utf8_lossy(&buf).into_owned();
                buf.clear();
                let line = line.trim_end_matches(['\r', '\n']);
                if line.trim().is_empty() {
                    continue;
                }
                let record = decode_record(line);
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    sent = tx.send(record) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                warn!("[{}] log stream read failed: {}", serial, e);
                break;
            }
        }
    }
}

async fn dispatch<F>(mut rx: mpsc::Receiver<LogRecord>, stopping: Arc<AtomicBool>, mut on_record: F)
where
    F: FnMut(LogRecord),
{
    while let Some(record) = rx.recv().await {
        if stopping.load(Ordering::SeqCst) {
            break;
        }
        on_record(record);
    }
}

async fn join_until(mut task: JoinHandle<()>, deadline: Instant, serial: &str, role: &str) {
    if tokio::time::timeout_at(deadline, &mut task).await.is_err() {
        warn!("[{}] stream {} did not finish in time, aborting", serial, role);
        task.abort();
    }
}

/// A running log stream. Dropping it stops the stream without waiting.
pub struct StreamHandle {
    id: Uuid,
    session: Arc<DeviceSession>,
    filter: StreamFilter,
    state: StreamState,
    grace: Duration,
    stopping: Arc<AtomicBool>,
    stop_tx: watch::Sender<bool>,
    reader: Option<JoinHandle<()>>,
    dispatcher: Option<JoinHandle<()>>,
    child: Option<Child>,
}

impl StreamHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn serial(&self) -> &str {
        self.session.serial()
    }

    pub fn filter(&self) -> &StreamFilter {
        &self.filter
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// True once the source ran dry (for example the device went away).
    /// The handle still has to be stopped to release the session's slot.
    pub fn is_finished(&self) -> bool {
        self.reader.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Stops the stream. Returns within the grace period plus the time to
    /// kill the stream process; no record is delivered after it returns.
    /// Calling it again is a no-op.
    pub async fn stop(&mut self) {
        if self.state == StreamState::Idle {
            return;
        }
        let serial = self.session.serial().to_string();
        self.stopping.store(true, Ordering::SeqCst);
        let _ = self.stop_tx.send(true);

        let deadline = Instant::now() + self.grace;
        if let Some(task) = self.reader.take() {
            join_until(task, deadline, &serial, "reader").await;
        }
        if let Some(task) = self.dispatcher.take() {
            join_until(task, deadline, &serial, "dispatcher").await;
        }

        if let Some(mut child) = self.child.take() {
            match tokio::time::timeout_at(deadline, child.wait()).await {
                Ok(Ok(status)) => debug!("[{}] stream process exited: {}", serial, status),
                Ok(Err(e)) => warn!("[{}] waiting for stream process failed: {}", serial, e),
                Err(_) => {
                    warn!("[{}] stream process still running, killing it", serial);
                    if let Err(e) = child.kill().await {
                        warn!("[{}] failed to kill stream process: {}", serial, e);
                    }
                }
            }
        }

        self.state = StreamState::Idle;
        self.session.end_stream();
        info!("[{}] log stream {} stopped", serial, self.id);
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        if self.state == StreamState::Idle {
            return;
        }
        self.stopping.store(true, Ordering::SeqCst);
        let _ = self.stop_tx.send(true);
        if let Some(task) = self.reader.take() {
            task.abort();
        }
        if let Some(task) = self.dispatcher.take() {
            task.abort();
        }
        if let Some(child) = self.child.as_mut() {
            let _ = child.start_kill();
        }
        self.session.end_stream();
        debug!("[{}] log stream {} dropped", self.session.serial(), self.id);
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle")
            .field("id", &self.id)
            .field("serial", &self.session.serial())
            .field("state", &self.state)
            .finish()
    }
}
