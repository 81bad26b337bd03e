//! Push-channel events.
//!
//! Every inbound frame is a JSON object whose `type` field selects the
//! payload shape. Decoding reads the discriminator first and only then
//! deserializes the matching payload, which is what lets us tell a frame we
//! cannot parse apart from a frame we do not understand.
//!
//! # Wire contract
//!
//! ```text
//! {"type":"qr","qr":"<payload>"}
//! {"type":"client_ready","clientId":"<user>_<agent>"}
//! {"type":"message","chatName":"...","text":"..."}            (or "message")
//! {"type":"message","chatName":"...","media":{"mimetype":"...","data":"<b64>","filename":"..."}}
//! {"type":"error","error":"..."}
//! {"type":"state_change","state":"..."}
//! ```

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::Deserialize;
use serde_json::Value;

use crate::errors::DecodeError;

/// Discriminator values of the inbound `type` field.
pub mod kind {
    /// Pairing code payload.
    pub const QR: &str = "qr";
    /// Backend session is ready for a client identity.
    pub const CLIENT_READY: &str = "client_ready";
    /// Inbound chat message.
    pub const MESSAGE: &str = "message";
    /// Backend-reported error.
    pub const ERROR: &str = "error";
    /// Informational backend sub-state.
    pub const STATE_CHANGE: &str = "state_change";
}

/// A decoded push-channel frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolEvent {
    /// New pairing artifact to display.
    Qr {
        /// Opaque QR payload
        payload: String,
    },

    /// Backend reports a client session as ready.
    ClientReady {
        /// Identity of the session that became ready
        client_id: String,
    },

    /// Chat message received by the backend session.
    Message(InboundMessage),

    /// Backend reported an error for this session.
    Error {
        /// Error text, verbatim
        detail: String,
    },

    /// Backend sub-state label changed.
    StateChange {
        /// New state label
        detail: String,
    },
}

impl ProtocolEvent {
    /// Decode a raw text frame.
    ///
    /// # Errors
    ///
    /// - `DecodeError::Malformed` if the frame is not a JSON object, has no
    ///   string `type`, or lacks fields required by its type
    /// - `DecodeError::Unrecognized` if `type` is not a known kind
    pub fn decode(raw: &str) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(raw)?;

        let kind = match &value {
            Value::Object(map) => match map.get("type") {
                Some(Value::String(kind)) => kind.clone(),
                Some(_) => return Err(DecodeError::Malformed("`type` is not a string".into())),
                None => return Err(DecodeError::Malformed("missing `type` field".into())),
            },
            _ => return Err(DecodeError::Malformed("frame is not a JSON object".into())),
        };

        match kind.as_str() {
            kind::QR => {
                let wire: QrWire = serde_json::from_value(value)?;
                Ok(Self::Qr { payload: wire.qr })
            },
            kind::CLIENT_READY => {
                let wire: ClientReadyWire = serde_json::from_value(value)?;
                Ok(Self::ClientReady { client_id: wire.client_id })
            },
            kind::MESSAGE => {
                let wire: MessageWire = serde_json::from_value(value)?;
                Ok(Self::Message(wire.into_message()?))
            },
            kind::ERROR => {
                let wire: ErrorWire = serde_json::from_value(value)?;
                Ok(Self::Error { detail: wire.detail() })
            },
            kind::STATE_CHANGE => {
                let wire: StateChangeWire = serde_json::from_value(value)?;
                Ok(Self::StateChange { detail: wire.state })
            },
            _ => Err(DecodeError::Unrecognized { kind }),
        }
    }

    /// Wire discriminator of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Qr { .. } => kind::QR,
            Self::ClientReady { .. } => kind::CLIENT_READY,
            Self::Message(_) => kind::MESSAGE,
            Self::Error { .. } => kind::ERROR,
            Self::StateChange { .. } => kind::STATE_CHANGE,
        }
    }
}

/// Chat message as delivered by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Display name of the chat the message came from.
    pub chat_name: String,
    /// Message content.
    pub body: MessageBody,
}

/// Content of a chat message.
///
/// Text and media are mutually exclusive shapes. Text sent alongside media is
/// the media caption, never a separate body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    /// Plain text.
    Text {
        /// Message text.
        text: String,
    },
    /// Media attachment with optional caption.
    Media {
        /// MIME type of the attachment.
        mime_type: String,
        /// Decoded attachment bytes.
        data: Vec<u8>,
        /// Attachment file name, empty when the sender provided none.
        filename: String,
        /// Caption text. `None` if absent or empty.
        caption: Option<String>,
    },
}

impl MessageBody {
    /// Text of a text body, caption of a media body.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text.as_str()),
            Self::Media { caption, .. } => caption.as_deref(),
        }
    }

    /// True for media bodies.
    pub fn is_media(&self) -> bool {
        matches!(self, Self::Media { .. })
    }
}

#[derive(Deserialize)]
struct QrWire {
    qr: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientReadyWire {
    client_id: String,
}

#[derive(Deserialize)]
struct ErrorWire {
    #[serde(default)]
    error: Option<Value>,
}

impl ErrorWire {
    fn detail(self) -> String {
        match self.error {
            Some(Value::String(text)) => text,
            Some(Value::Null) | None => "unspecified error".to_string(),
            Some(other) => other.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct StateChangeWire {
    state: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageWire {
    chat_name: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    media: Option<MediaWire>,
}

#[derive(Deserialize)]
struct MediaWire {
    #[serde(alias = "mimeType")]
    mimetype: String,
    data: String,
    #[serde(default)]
    filename: Option<String>,
}

impl MessageWire {
    fn into_message(self) -> Result<InboundMessage, DecodeError> {
        let text = self.text.or(self.message);

        let body = match self.media {
            Some(media) => {
                let data = STANDARD
                    .decode(media.data.as_bytes())
                    .map_err(|e| DecodeError::Malformed(format!("media data: {e}")))?;
                MessageBody::Media {
                    mime_type: media.mimetype,
                    data,
                    filename: media.filename.unwrap_or_default(),
                    caption: text.filter(|t| !t.is_empty()),
                }
            },
            None => match text {
                Some(text) => MessageBody::Text { text },
                None => {
                    return Err(DecodeError::Malformed(
                        "message has neither text nor media".into(),
                    ));
                },
            },
        };

        Ok(InboundMessage { chat_name: self.chat_name, body })
    }
}
