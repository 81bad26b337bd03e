//! Frames written by the client to the push channel.

use serde::{Deserialize, Serialize};

use crate::errors::EncodeError;

/// Client-to-gateway push-channel frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelRequest {
    /// Send a text message through the push channel instead of the request
    /// channel.
    SendMessage {
        /// Confirmed session identity.
        #[serde(rename = "clientId")]
        client_id: String,
        /// Fully qualified recipient address. Omitted when the gateway
        /// routes to a default chat.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<String>,
        /// Message text.
        message: String,
    },
}

impl ChannelRequest {
    /// Serialize to a text frame.
    pub fn encode(&self) -> Result<String, EncodeError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    #[test]
    fn send_message_is_tagged() {
        let frame = ChannelRequest::SendMessage {
            client_id: "u_a".into(),
            to: Some("1555@c.us".into()),
            message: "hi".into(),
        }
        .encode()
        .unwrap();

        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(
            value,
            json!({"type": "send_message", "clientId": "u_a", "to": "1555@c.us", "message": "hi"})
        );
    }

    #[test]
    fn send_message_without_recipient_omits_to() {
        let frame = ChannelRequest::SendMessage {
            client_id: "u_a".into(),
            to: None,
            message: "hi".into(),
        }
        .encode()
        .unwrap();

        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value, json!({"type": "send_message", "clientId": "u_a", "message": "hi"}));
    }
}
