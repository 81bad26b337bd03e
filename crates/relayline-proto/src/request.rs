//! Request-channel bodies.
//!
//! The request channel is plain request/response: `POST /start` bootstraps a
//! backend session, `POST /send` submits one outbound message. Field names
//! follow the backend's camelCase JSON.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::EncodeError;

/// Body of `POST /start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    /// Opaque user identifier.
    pub user_id: String,
    /// Opaque agent identifier.
    pub agent_id: String,
}

/// Successful response to `POST /start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    /// Identity the backend assigned to the session.
    pub client_id: String,
}

/// Body of `POST /send`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    /// Confirmed session identity.
    pub client_id: String,
    /// Fully qualified recipient address.
    pub to: String,
    /// Message content.
    #[serde(flatten)]
    pub content: SendContent,
}

impl SendRequest {
    /// Serialize to a JSON string.
    pub fn encode(&self) -> Result<String, EncodeError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Content of an outbound message.
///
/// The two shapes are mutually exclusive on the wire: a text send carries
/// `message`, a media send carries `media` and an optional `caption`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SendContent {
    /// Plain text message.
    Text {
        /// Message text.
        message: String,
    },
    /// Media attachment.
    Media {
        /// Encoded attachment.
        media: MediaUpload,
        /// Caption text, omitted when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
}

/// Media attachment as transmitted to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaUpload {
    /// MIME type of the attachment.
    pub mime_type: String,
    /// File name of the attachment.
    pub filename: String,
    /// Base64-encoded attachment bytes.
    pub data: String,
}

impl MediaUpload {
    /// Encode raw attachment bytes.
    pub fn from_bytes(
        mime_type: impl Into<String>,
        filename: impl Into<String>,
        bytes: &[u8],
    ) -> Self {
        Self { mime_type: mime_type.into(), filename: filename.into(), data: STANDARD.encode(bytes) }
    }
}

/// Successful response to `POST /send`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResponse {
    /// Backend status label.
    #[serde(default)]
    pub status: String,
}

/// Failure body returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error detail; usually a string, but any JSON is accepted.
    pub error: Value,
}

impl ErrorBody {
    /// Error detail as text, strings verbatim.
    pub fn detail(&self) -> String {
        match &self.error {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}
