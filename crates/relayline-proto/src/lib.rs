//! Relayline wire protocol
//!
//! Typed representations of everything that crosses the wire between the
//! session manager and the relay backend:
//!
//! - [`ProtocolEvent`]: push-channel frames (JSON text with a `type`
//!   discriminator) decoded into a closed set of variants.
//! - [`StartRequest`] / [`SendRequest`]: request-channel bodies for session
//!   bootstrap and outbound sends.
//! - [`ChannelRequest`]: frames the client may write to the push channel.
//!
//! Decoding never panics. Frames that cannot be parsed and frames with an
//! unknown `type` both surface as [`DecodeError`], with distinct variants so
//! callers can log them differently.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
pub mod event;
pub mod outbound;
pub mod request;

pub use errors::{DecodeError, EncodeError};
pub use event::{InboundMessage, MessageBody, ProtocolEvent};
pub use outbound::ChannelRequest;
pub use request::{
    ErrorBody, MediaUpload, SendContent, SendRequest, SendResponse, StartRequest, StartResponse,
};
