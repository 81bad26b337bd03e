//! Request-channel seam.
//!
//! The client never performs I/O itself. Requests it wants to make are
//! returned as actions; a runtime executes them through a [`Backend`] and
//! feeds the outcome back as an event.

use async_trait::async_trait;
use relayline_proto::{SendRequest, SendResponse, StartRequest, StartResponse};
use thiserror::Error;

use crate::composer::SendFailure;

/// Errors returned by a backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Backend answered with a non-success status
    #[error("backend rejected request (status {status}): {detail}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Error text from the response body
        detail: String,
    },

    /// Request could not be delivered or timed out
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// Success status with an unreadable body
    #[error("invalid response body: {0}")]
    InvalidBody(String),
}

impl From<BackendError> for SendFailure {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Rejected { detail, .. } => Self::Rejected { detail },
            BackendError::Unreachable(detail) | BackendError::InvalidBody(detail) => {
                Self::Unreachable { detail }
            },
        }
    }
}

/// Request/response backend.
///
/// Implementations are cheap to clone; each in-flight request runs on its own
/// clone.
#[async_trait]
pub trait Backend: Clone + Send + Sync + 'static {
    /// Bootstrap a backend session (`POST /start`).
    async fn start(&self, request: StartRequest) -> Result<StartResponse, BackendError>;

    /// Submit one outbound message (`POST /send`).
    async fn send(&self, request: SendRequest) -> Result<SendResponse, BackendError>;
}
