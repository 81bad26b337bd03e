//! Fuzz target for ProtocolEvent::decode
//!
//! Feeds arbitrary text to the inbound frame decoder to find:
//! - Parser crashes or panics
//! - Deeply nested JSON that exhausts the stack
//! - Media payloads whose base64 handling misbehaves
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use relayline_proto::ProtocolEvent;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(event) = ProtocolEvent::decode(raw) {
        // Decoded events always report a known wire kind
        assert!(!event.kind().is_empty());
    }
});
