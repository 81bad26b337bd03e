//! Session state machine.
//!
//! Holds the authoritative connection status and the pairing artifact. Status
//! is reconciled from two sources: lifecycle signals of the push channel and
//! server-reported protocol events. Events are applied strictly in the order
//! they are handed in.
//!
//! # State Machine
//!
//! ```text
//! ┌──────────────┐   open    ┌────────────┐  client_ready  ┌───────────┐
//! │ Disconnected │──────────>│ Connecting │───────────────>│ Connected │
//! └──────────────┘           └────────────┘   (own key)    └───────────┘
//!        ^                         │                             │
//!        └─────────────────────────┴─────────────────────────────┘
//!                  channel closed / channel error / error event
//!
//! ┌──────────┐  open
//! │ Erroring │──────> Connecting          (bootstrap failed)
//! └──────────┘
//! ```

use std::fmt;

use relayline_proto::{ProtocolEvent, event::kind};

use crate::identity::SessionIdentity;

/// Detail attached when the bootstrap request fails.
pub const START_FAILED_DETAIL: &str = "Error starting client";

/// Coarse connection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection
    Disconnected,
    /// Channel opening or opened, waiting for `client_ready`
    Connecting,
    /// Backend confirmed the session identity
    Connected,
    /// Session could not be started
    Erroring,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Erroring => "Erroring",
        };
        f.write_str(label)
    }
}

/// Status snapshot: state plus optional free-text detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    /// Connection state
    pub state: ConnectionState,
    /// Server- or client-supplied detail
    pub detail: Option<String>,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{} ({detail})", self.state),
            None => write!(f, "{}", self.state),
        }
    }
}

/// Actions returned by the session state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Status or detail changed
    StatusChanged(SessionStatus),
    /// New pairing artifact to display
    PairingUpdated(String),
    /// Backend confirmed the session identity
    IdentityConfirmed(String),
    /// Backend reported an error
    ServerError(String),
    /// Event was valid but not applicable right now
    Ignored {
        /// Wire kind of the ignored event
        kind: &'static str,
        /// Why it was ignored
        reason: String,
    },
}

/// Session state machine
#[derive(Debug, Clone)]
pub struct Session {
    identity: SessionIdentity,
    state: ConnectionState,
    detail: Option<String>,
    pairing: Option<String>,
    /// Confirmed identity; set only on a matching `client_ready`
    client_id: Option<String>,
    channel_open: bool,
}

impl Session {
    /// Create a disconnected session for `identity`.
    pub fn new(identity: SessionIdentity) -> Self {
        Self {
            identity,
            state: ConnectionState::Disconnected,
            detail: None,
            pairing: None,
            client_id: None,
            channel_open: false,
        }
    }

    /// Identity this session belongs to
    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    /// Current state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Current detail
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Status snapshot
    pub fn status(&self) -> SessionStatus {
        SessionStatus { state: self.state, detail: self.detail.clone() }
    }

    /// Latest pairing artifact. Survives reaching `Connected`.
    pub fn pairing(&self) -> Option<&str> {
        self.pairing.as_deref()
    }

    /// Confirmed client identity, present only while `Connected`.
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    /// Whether the push channel is currently open
    pub fn is_channel_open(&self) -> bool {
        self.channel_open
    }

    /// A connection attempt started (initial open or reconnect).
    pub fn begin_connecting(&mut self) -> Vec<SessionAction> {
        self.channel_open = false;
        self.client_id = None;
        self.transition(ConnectionState::Connecting, None)
    }

    /// The push channel reported it is open. Status stays `Connecting` until
    /// the backend confirms the identity.
    pub fn handle_channel_opened(&mut self) {
        self.channel_open = true;
    }

    /// The push channel closed or failed.
    pub fn handle_channel_lost(&mut self, detail: Option<String>) -> Vec<SessionAction> {
        self.channel_open = false;
        self.client_id = None;
        self.transition(ConnectionState::Disconnected, detail)
    }

    /// The bootstrap request failed.
    pub fn handle_start_failed(&mut self) -> Vec<SessionAction> {
        self.channel_open = false;
        self.client_id = None;
        self.transition(ConnectionState::Erroring, Some(START_FAILED_DETAIL.to_owned()))
    }

    /// Explicit shutdown.
    pub fn handle_shutdown(&mut self) -> Vec<SessionAction> {
        self.handle_channel_lost(None)
    }

    /// Apply one decoded protocol event.
    ///
    /// Inbound chat messages do not affect the session and produce no actions.
    pub fn handle_event(&mut self, event: &ProtocolEvent) -> Vec<SessionAction> {
        match event {
            ProtocolEvent::Qr { payload } => self.handle_qr(payload),
            ProtocolEvent::ClientReady { client_id } => self.handle_client_ready(client_id),
            ProtocolEvent::Error { detail } => {
                self.channel_open = false;
                self.client_id = None;
                let mut actions = vec![SessionAction::ServerError(detail.clone())];
                actions.extend(self.transition(ConnectionState::Disconnected, Some(detail.clone())));
                actions
            },
            ProtocolEvent::StateChange { detail } => match self.state {
                ConnectionState::Connecting | ConnectionState::Connected => {
                    self.transition(self.state, Some(detail.clone()))
                },
                state => vec![SessionAction::Ignored {
                    kind: kind::STATE_CHANGE,
                    reason: format!("no connection in {state}"),
                }],
            },
            ProtocolEvent::Message(_) => Vec::new(),
        }
    }

    fn handle_qr(&mut self, payload: &str) -> Vec<SessionAction> {
        if self.pairing.as_deref() == Some(payload) {
            return Vec::new();
        }

        self.pairing = Some(payload.to_owned());
        vec![SessionAction::PairingUpdated(payload.to_owned())]
    }

    fn handle_client_ready(&mut self, client_id: &str) -> Vec<SessionAction> {
        if !self.channel_open {
            return vec![SessionAction::Ignored {
                kind: kind::CLIENT_READY,
                reason: "channel not open".to_owned(),
            }];
        }

        let expected = self.identity.session_key();
        if client_id != expected {
            return vec![SessionAction::Ignored {
                kind: kind::CLIENT_READY,
                reason: format!("foreign identity {client_id}, expected {expected}"),
            }];
        }

        match self.state {
            ConnectionState::Connecting => {},
            ConnectionState::Connected => return Vec::new(),
            state => {
                return vec![SessionAction::Ignored {
                    kind: kind::CLIENT_READY,
                    reason: format!("no connection attempt in {state}"),
                }];
            },
        }

        self.client_id = Some(expected.clone());
        let mut actions = vec![SessionAction::IdentityConfirmed(expected)];
        actions.extend(self.transition(ConnectionState::Connected, None));
        actions
    }

    fn transition(&mut self, state: ConnectionState, detail: Option<String>) -> Vec<SessionAction> {
        if self.state == state && self.detail == detail {
            return Vec::new();
        }

        self.state = state;
        self.detail = detail;
        vec![SessionAction::StatusChanged(self.status())]
    }
}
