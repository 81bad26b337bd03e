//! Client construction errors.

use relayline_core::{ChannelError, IdentityError};
use thiserror::Error;

/// Errors that prevent a client from being created.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// User or agent identifier invalid
    #[error("invalid identity: {0}")]
    Identity(#[from] IdentityError),

    /// Gateway endpoint invalid
    #[error("invalid channel configuration: {0}")]
    Channel(#[from] ChannelError),
}
