//! Observable state snapshots for invariant checking.
//!
//! A snapshot captures the observable state of one session plus the history
//! the time-based invariants need. Invariants operate on snapshots rather
//! than live state to keep checks consistent.

use relayline_client::{Client, ClientAction, Environment};
use relayline_core::{ChannelPhase, ConnectionState};

/// Snapshot of a session's observable state.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// `"{user_id}_{agent_id}"` of the session
    pub session_key: String,
    /// Connection state
    pub state: ConnectionState,
    /// Confirmed backend identity
    pub client_id: Option<String>,
    /// Push-channel phase
    pub channel_phase: ChannelPhase,
    /// Whether a reconnect deadline is armed
    pub reconnect_pending: bool,
    /// Reconnects scheduled since the last connect
    pub reconnects_since_connect: usize,
    /// Pairing artifact after every recorded step, oldest first
    pub pairing_history: Vec<Option<String>>,
}

impl SessionSnapshot {
    /// Snapshot of a session that was never driven.
    pub fn detached(session_key: impl Into<String>) -> Self {
        Self {
            session_key: session_key.into(),
            state: ConnectionState::Disconnected,
            client_id: None,
            channel_phase: ChannelPhase::Idle,
            reconnect_pending: false,
            reconnects_since_connect: 0,
            pairing_history: vec![None],
        }
    }

    /// Capture the current state of `client`.
    pub fn capture<E: Environment>(client: &Client<E>) -> Self {
        let mut snapshot = Self::detached(client.session().identity().session_key());
        snapshot.pairing_history.clear();
        snapshot.record(client, &[]);
        snapshot
    }

    /// Update from `client` after it returned `actions`.
    pub fn record<E: Environment>(&mut self, client: &Client<E>, actions: &[ClientAction]) {
        for action in actions {
            match action {
                ClientAction::Connect { .. } => self.reconnects_since_connect = 0,
                ClientAction::ReconnectScheduled { .. } => self.reconnects_since_connect += 1,
                _ => {},
            }
        }

        let session = client.session();
        self.state = session.state();
        self.client_id = session.client_id().map(str::to_owned);
        self.channel_phase = client.channel_phase();
        self.reconnect_pending = client.reconnect_deadline().is_some();
        self.pairing_history.push(session.pairing().map(str::to_owned));
    }

    /// Latest pairing artifact.
    pub fn pairing(&self) -> Option<&str> {
        self.pairing_history.last().and_then(Option::as_deref)
    }
}
