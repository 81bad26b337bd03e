//! Property-based tests for push-channel decoding.
//!
//! Decoding must be total: every input either yields an event or a
//! `DecodeError`, and the error variant must match the kind of failure.

use proptest::prelude::*;
use relayline_proto::{DecodeError, MessageBody, ProtocolEvent};
use serde_json::json;

/// Strategy for arbitrary JSON-ish text, biased towards object frames.
fn arbitrary_frame_text() -> impl Strategy<Value = String> {
    prop_oneof![
        any::<String>(),
        "\\{\"type\":\"[a-z_]{0,12}\"(,\"[a-zA-Z]{1,8}\":\"[ -~]{0,16}\"){0,3}\\}",
        prop::collection::vec(any::<u8>(), 0..64)
            .prop_map(|bytes| String::from_utf8_lossy(&bytes).into_owned()),
    ]
}

const KNOWN_KINDS: [&str; 5] = ["qr", "client_ready", "message", "error", "state_change"];

proptest! {
    #[test]
    fn prop_decode_is_total(raw in arbitrary_frame_text()) {
        // PROPERTY: never panics, and a success always reports a known kind
        if let Ok(event) = ProtocolEvent::decode(&raw) {
            prop_assert!(KNOWN_KINDS.contains(&event.kind()));
        }
    }

    #[test]
    fn prop_unknown_kind_is_unrecognized(kind in "[a-z_]{1,16}") {
        prop_assume!(!KNOWN_KINDS.contains(&kind.as_str()));

        let raw = json!({"type": kind.clone(), "payload": 1}).to_string();

        prop_assert_eq!(ProtocolEvent::decode(&raw), Err(DecodeError::Unrecognized { kind }));
    }

    #[test]
    fn prop_qr_payload_survives_decoding(payload in any::<String>()) {
        let raw = json!({"type": "qr", "qr": payload.clone()}).to_string();

        prop_assert_eq!(ProtocolEvent::decode(&raw), Ok(ProtocolEvent::Qr { payload }));
    }

    #[test]
    fn prop_text_message_keeps_chat_and_text(chat in any::<String>(), text in any::<String>()) {
        let raw = json!({"type": "message", "chatName": chat.clone(), "text": text.clone()})
            .to_string();

        let Ok(ProtocolEvent::Message(message)) = ProtocolEvent::decode(&raw) else {
            return Err(TestCaseError::fail("expected message event"));
        };
        prop_assert_eq!(message.chat_name, chat);
        prop_assert_eq!(message.body, MessageBody::Text { text });
    }

    #[test]
    fn prop_non_object_json_is_malformed(n in any::<i64>(), s in "[a-z]{0,8}") {
        for raw in [n.to_string(), json!(s).to_string(), json!([n, s]).to_string()] {
            prop_assert!(matches!(ProtocolEvent::decode(&raw), Err(DecodeError::Malformed(_))));
        }
    }
}
