//! WebSocket push channel.
//!
//! Each connection attempt runs in its own task. The task reports lifecycle
//! signals tagged with the attempt number; protocol logic stays in the
//! Sans-IO [`Client`](crate::Client).

use futures::{SinkExt, StreamExt};
use relayline_core::{ChannelSignal, SignalKind};
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::debug;

/// Transport errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The connection task has stopped.
    #[error("connection closed")]
    Closed,
}

/// Handle to one physical connection.
///
/// Dropping the handle stops the connection task.
pub struct ChannelHandle {
    attempt: u64,
    outgoing: mpsc::UnboundedSender<String>,
    task: JoinHandle<()>,
}

impl ChannelHandle {
    /// Attempt this connection belongs to
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    /// Queue a text frame for sending.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Closed` if the connection task has stopped.
    pub fn send(&self, text: String) -> Result<(), TransportError> {
        self.outgoing.send(text).map_err(|_| TransportError::Closed)
    }

    /// Whether the connection task is still running
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the connection.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Open a WebSocket connection to `url` in the background.
///
/// Returns immediately. Progress is reported on `signals`: `Opened` once the
/// handshake completes, then any number of `Frame`s, and finally exactly one
/// of `Closed` or `Error`. Nothing is reported after the handle is dropped.
///
/// Must be called from within a tokio runtime.
pub fn connect(
    url: String,
    attempt: u64,
    signals: mpsc::UnboundedSender<ChannelSignal>,
) -> ChannelHandle {
    let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run_connection(url, attempt, outgoing_rx, signals));
    ChannelHandle { attempt, outgoing, task }
}

async fn run_connection(
    url: String,
    attempt: u64,
    mut outgoing: mpsc::UnboundedReceiver<String>,
    signals: mpsc::UnboundedSender<ChannelSignal>,
) {
    let emit = |kind: SignalKind| {
        // Receiver gone means the runtime stopped; nothing left to report to.
        let _ = signals.send(ChannelSignal { attempt, kind });
    };

    let stream = match connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            emit(SignalKind::Error { cause: e.to_string() });
            return;
        },
    };
    emit(SignalKind::Opened);

    let (mut sink, mut source) = stream.split();
    loop {
        tokio::select! {
            frame = outgoing.recv() => {
                let Some(text) = frame else {
                    let _ = sink.close().await;
                    return;
                };
                if let Err(e) = sink.send(Message::text(text)).await {
                    emit(SignalKind::Error { cause: e.to_string() });
                    return;
                }
            },
            message = source.next() => match message {
                Some(Ok(Message::Text(text))) => emit(SignalKind::Frame(text.as_str().to_owned())),
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.as_str().to_owned())
                        .filter(|reason| !reason.is_empty());
                    emit(SignalKind::Closed { reason });
                    return;
                },
                Some(Ok(other)) => debug!(attempt, kind = ?other, "ignoring non-text message"),
                Some(Err(e)) => {
                    emit(SignalKind::Error { cause: e.to_string() });
                    return;
                },
                None => {
                    emit(SignalKind::Closed { reason: None });
                    return;
                },
            },
        }
    }
}
