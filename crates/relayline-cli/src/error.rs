//! Errors at the binary boundary.

use relayline_app::{HandleError, RuntimeError};
use relayline_client::{BackendError, ClientError, transport::TransportError};
use relayline_core::IdentityError;
use thiserror::Error;

/// Anything that ends the process with a failure.
#[derive(Error, Debug)]
pub enum CliError {
    /// User or agent id rejected
    #[error("invalid identity: {0}")]
    Identity(#[from] IdentityError),

    /// Client could not be configured
    #[error("invalid configuration: {0}")]
    Client(#[from] ClientError),

    /// HTTP backend could not be built
    #[error("backend setup failed: {0}")]
    Backend(#[from] BackendError),

    /// Runtime stopped with an error
    #[error(transparent)]
    Runtime(#[from] RuntimeError<TransportError>),

    /// Runtime went away while commands were pending
    #[error(transparent)]
    Session(#[from] HandleError),

    /// Runtime task panicked or was cancelled
    #[error("runtime task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Reading stdin failed
    #[error("input error: {0}")]
    Io(#[from] std::io::Error),
}
