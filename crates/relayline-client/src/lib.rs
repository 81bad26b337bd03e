//! Client
//!
//! Action-based client state machine for one relay session. Tracks connection
//! status and pairing, logs inbound chat messages, and composes outbound
//! sends.
//!
//! # Architecture
//!
//! The client follows the same Sans-IO and Action-Based patterns as
//! [`relayline_core`]. It receives events ([`ClientEvent`]), processes them
//! through pure state machine logic, and returns actions ([`ClientAction`]) for
//! the caller to execute.
//!
//! # Components
//!
//! - [`Client`]: Top-level state machine of a session
//! - [`Dispatcher`]: Inbound frame routing and the message log
//! - [`Composer`]: Draft validation and outbound request building
//! - [`Backend`]: Request/response seam for `start` and `send`
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::connect`]: WebSocket push channel
//! - [`http::HttpBackend`]: HTTP request channel

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod backend;
mod client;
mod composer;
mod config;
mod dispatcher;
mod error;
mod event;
mod message;

#[cfg(feature = "transport")]
pub mod http;
#[cfg(feature = "transport")]
pub mod transport;

pub use backend::{Backend, BackendError};
pub use client::{Client, RECONNECTS_EXHAUSTED};
pub use composer::{
    Composer, DEFAULT_RECIPIENT_DOMAIN, MediaPayload, OutboundDraft, SendFailure, SendRoute,
    local_echo, normalize_recipient,
};
pub use config::{ClientConfig, DEFAULT_GATEWAY_URL, DEFAULT_LOCAL_SENDER};
pub use dispatcher::{Dispatched, Dispatcher};
pub use error::ClientError;
pub use event::{ClientAction, ClientEvent, SendAck, SendId};
pub use message::{ChatMessage, MessageLog};
pub use relayline_core::env::Environment;
