//! Relayline core
//!
//! Pure state machines for the client side of a chat-relay session. Nothing
//! in this crate performs I/O: methods take inputs (time, lifecycle signals,
//! decoded events) and return actions for a driver to execute.
//!
//! # Components
//!
//! - [`env::Environment`]: time and randomness, swappable for simulation
//! - [`identity::IdentityResolver`]: validates identifiers, mints the
//!   per-process connection token
//! - [`channel::Channel`]: logical push-channel lifecycle and reconnect timer
//! - [`session::Session`]: authoritative connection status and pairing code

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod channel;
pub mod env;
pub mod error;
pub mod identity;
pub mod reconnect;
pub mod session;

pub use channel::{Channel, ChannelAction, ChannelPhase, ChannelSignal, SignalKind};
pub use error::{ChannelError, IdentityError};
pub use identity::{IdentityResolver, SessionIdentity};
pub use reconnect::ReconnectPolicy;
pub use session::{ConnectionState, Session, SessionAction, SessionStatus};
