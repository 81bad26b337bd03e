//! Wire protocol errors.

use thiserror::Error;

/// Failure to turn a push-channel frame into a [`crate::ProtocolEvent`].
///
/// Neither variant is fatal to a session: the caller logs the error and keeps
/// processing later frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Frame is not a JSON object, has no string `type`, or is missing a
    /// field required by its type.
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// Frame parsed, but its `type` is not one we understand.
    #[error("unrecognized frame type: {kind:?}")]
    Unrecognized {
        /// The `type` value that was received
        kind: String,
    },
}

impl DecodeError {
    /// Returns true if the frame was well-formed but of an unknown kind.
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, Self::Unrecognized { .. })
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// Failure to serialize an outbound body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("encode failed: {0}")]
pub struct EncodeError(pub String);

impl From<serde_json::Error> for EncodeError {
    fn from(err: serde_json::Error) -> Self {
        Self(err.to_string())
    }
}
