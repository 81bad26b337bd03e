//! Standard invariant checks.

use relayline_core::{ChannelPhase, ConnectionState};

use super::{Invariant, InvariantResult, SessionSnapshot, Violation};

/// A lost connection schedules at most one reconnect.
///
/// Between two connects no more than one reconnect may be scheduled, and a
/// reconnect deadline only exists while the channel is down.
pub struct SingleReconnect;

impl Invariant for SingleReconnect {
    fn name(&self) -> &'static str {
        "single_reconnect"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        if state.reconnects_since_connect > 1 {
            return Err(Violation {
                invariant: self.name(),
                message: format!(
                    "{} reconnects scheduled without a connect in between",
                    state.reconnects_since_connect
                ),
            });
        }

        if state.reconnect_pending && state.channel_phase != ChannelPhase::Closed {
            return Err(Violation {
                invariant: self.name(),
                message: format!("reconnect pending while channel is {:?}", state.channel_phase),
            });
        }
        Ok(())
    }
}

/// `Connected` is only reached with the session's own identity.
///
/// The confirmed client id must equal the session key and the channel must
/// be open.
pub struct ConnectedMatchesIdentity;

impl Invariant for ConnectedMatchesIdentity {
    fn name(&self) -> &'static str {
        "connected_matches_identity"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        if state.state != ConnectionState::Connected {
            return Ok(());
        }

        if state.client_id.as_deref() != Some(state.session_key.as_str()) {
            return Err(Violation {
                invariant: self.name(),
                message: format!(
                    "connected as {:?}, session key is {}",
                    state.client_id, state.session_key
                ),
            });
        }

        if state.channel_phase != ChannelPhase::Open {
            return Err(Violation {
                invariant: self.name(),
                message: format!("connected while channel is {:?}", state.channel_phase),
            });
        }
        Ok(())
    }
}

/// Once shown, a pairing artifact is replaced but never cleared.
pub struct PairingRetained;

impl Invariant for PairingRetained {
    fn name(&self) -> &'static str {
        "pairing_retained"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        let cleared = state
            .pairing_history
            .windows(2)
            .position(|pair| pair[0].is_some() && pair[1].is_none());

        match cleared {
            Some(step) => Err(Violation {
                invariant: self.name(),
                message: format!("pairing cleared at step {}", step + 1),
            }),
            None => Ok(()),
        }
    }
}
