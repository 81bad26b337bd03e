//! Observable session state.

use relayline_client::{ChatMessage, Client, Environment, OutboundDraft};
use relayline_core::{ConnectionState, SessionStatus};

/// Snapshot of everything a presentation layer shows for one session.
///
/// Published by the [`crate::Runtime`] after every processed event; read it
/// through [`crate::SessionHandle::view`] or wait for changes with
/// [`crate::SessionHandle::subscribe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    /// Connection state and detail
    pub status: SessionStatus,
    /// Latest pairing artifact, kept after connecting
    pub pairing: Option<String>,
    /// Confirmed backend identity
    pub client_id: Option<String>,
    /// Message log in display order
    pub messages: Vec<ChatMessage>,
    /// Current draft
    pub draft: OutboundDraft,
    /// Number of in-flight sends
    pub pending_sends: usize,
}

impl SessionView {
    /// Capture the current state of `client`.
    pub fn capture<E: Environment>(client: &Client<E>) -> Self {
        let session = client.session();
        Self {
            status: session.status(),
            pairing: session.pairing().map(str::to_owned),
            client_id: session.client_id().map(str::to_owned),
            messages: client.messages().to_vec(),
            draft: client.draft().clone(),
            pending_sends: client.pending_sends(),
        }
    }

    /// Short status line.
    ///
    /// Connecting shows progress; the other states show their detail when
    /// there is one.
    pub fn status_text(&self) -> String {
        match (self.status.state, self.status.detail.as_deref()) {
            (ConnectionState::Connecting, None) => "Connecting...".to_owned(),
            (ConnectionState::Erroring, Some(detail)) => detail.to_owned(),
            _ => self.status.to_string(),
        }
    }

    /// Whether sends can be submitted.
    pub fn can_send(&self) -> bool {
        self.status.state == ConnectionState::Connected && self.client_id.is_some()
    }
}

impl Default for SessionView {
    fn default() -> Self {
        Self {
            status: SessionStatus { state: ConnectionState::Disconnected, detail: None },
            pairing: None,
            client_id: None,
            messages: Vec::new(),
            draft: OutboundDraft::default(),
            pending_sends: 0,
        }
    }
}
