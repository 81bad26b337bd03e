//! Error types for the relayline core.
//!
//! Identity errors are user-correctable and block a session from starting.
//! Channel errors are local precondition failures; physical connection drops
//! are not errors at all, they are lifecycle signals recovered by reconnect.

use thiserror::Error;

use crate::channel::ChannelPhase;

/// Errors produced while resolving a session identity.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityError {
    /// User identifier was empty or whitespace
    #[error("user id must not be empty")]
    EmptyUserId,

    /// Agent identifier was empty or whitespace
    #[error("agent id must not be empty")]
    EmptyAgentId,
}

/// Errors that can occur during channel operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// Send attempted while no connection is open
    #[error("channel not open (phase {phase:?})")]
    NotOpen {
        /// Phase when the send was attempted
        phase: ChannelPhase,
    },

    /// Invalid lifecycle transition attempted
    #[error("invalid state transition: cannot {operation} from {phase:?}")]
    InvalidState {
        /// Current phase when the error occurred
        phase: ChannelPhase,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// Gateway endpoint could not be parsed
    #[error("invalid gateway url: {0}")]
    InvalidUrl(String),
}

impl ChannelError {
    /// Returns true if the operation may succeed once the channel reconnects.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NotOpen { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_not_open_is_transient() {
        assert!(ChannelError::NotOpen { phase: ChannelPhase::Closed }.is_transient());
        assert!(!ChannelError::InvalidUrl("x".into()).is_transient());
        assert!(
            !ChannelError::InvalidState { phase: ChannelPhase::Open, operation: "open" }
                .is_transient()
        );
    }
}
