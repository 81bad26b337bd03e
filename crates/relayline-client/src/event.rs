//! Client events and actions.

use std::{fmt, time::Duration};

use relayline_core::SessionStatus;
use relayline_proto::{SendRequest, SendResponse, StartRequest, StartResponse};
use uuid::Uuid;

use crate::{
    backend::BackendError,
    composer::{OutboundDraft, SendFailure},
    message::ChatMessage,
};

/// Idempotency marker of one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SendId(pub Uuid);

impl fmt::Display for SendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendAck {
    /// Backend status label (empty for push-channel sends)
    pub status: String,
}

/// Events the caller feeds into the client.
///
/// The caller is responsible for:
/// - Executing requests and reporting their outcome
/// - Reporting lifecycle signals of the physical connection
/// - Driving time forward via ticks
/// - Forwarding user intents (open, edit, submit, shutdown)
///
/// Generic over `I` (Instant type) to support both production
/// (`std::time::Instant`) and simulation (`tokio::time::Instant`) environments.
#[derive(Debug, Clone)]
pub enum ClientEvent<I = std::time::Instant> {
    /// User wants the session started or restarted.
    Open,

    /// `POST /start` succeeded.
    StartCompleted(StartResponse),

    /// `POST /start` failed.
    StartFailed(BackendError),

    /// Physical connection for `attempt` is established.
    ChannelOpened {
        /// Attempt the signal belongs to
        attempt: u64,
    },

    /// Text frame received on `attempt`.
    ChannelFrame {
        /// Attempt the frame belongs to
        attempt: u64,
        /// Raw frame text
        text: String,
    },

    /// Connection for `attempt` closed.
    ChannelClosed {
        /// Attempt the signal belongs to
        attempt: u64,
        /// Close reason, if any
        reason: Option<String>,
        /// Current time from the environment
        now: I,
    },

    /// Connection for `attempt` failed.
    ChannelError {
        /// Attempt the signal belongs to
        attempt: u64,
        /// Failure description
        cause: String,
        /// Current time from the environment
        now: I,
    },

    /// Time tick; fires due reconnects.
    Tick {
        /// Current time from the environment
        now: I,
    },

    /// User edited the draft.
    EditDraft(OutboundDraft),

    /// User submitted the current draft.
    Submit,

    /// A request-channel send finished.
    SendCompleted {
        /// Submission the result belongs to
        id: SendId,
        /// Backend outcome
        result: Result<SendResponse, BackendError>,
    },

    /// Explicit shutdown.
    Shutdown,
}

/// Actions the client produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Issue `POST /start` and report the outcome.
    StartSession(StartRequest),

    /// Open a physical connection, releasing any previous one.
    Connect {
        /// Endpoint including the connection token
        url: String,
        /// Attempt number to tag signals with
        attempt: u64,
    },

    /// Release the physical connection.
    Disconnect,

    /// Write a text frame to the open connection.
    SendFrame(String),

    /// Issue `POST /send` and report the outcome with `id`.
    SubmitSend {
        /// Submission marker
        id: SendId,
        /// Request body
        request: SendRequest,
    },

    /// Session status changed.
    StatusChanged(SessionStatus),

    /// New pairing artifact to display.
    PairingUpdated(String),

    /// Message appended to the log.
    MessageAppended(ChatMessage),

    /// Reconnect scheduled after a drop.
    ReconnectScheduled {
        /// Time until the reconnect fires
        delay: Duration,
    },

    /// Submission finished.
    SendSettled {
        /// Submission marker
        id: SendId,
        /// Outcome
        outcome: Result<SendAck, SendFailure>,
    },
}
