//! Fuzz target for the client event pipeline
//!
//! Drives a `Client` with arbitrary interleavings of lifecycle signals, raw
//! inbound frames, time and user intents.
//!
//! # Invariants
//!
//! - NEVER panic, whatever the frames contain
//! - `Connected` only with the session's own identity
//! - At most one reconnect scheduled between two connects
//! - A pairing artifact, once shown, is never cleared

#![no_main]

use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use relayline_client::{
    BackendError, Client, ClientAction, ClientConfig, ClientEvent, Environment, OutboundDraft,
};
use relayline_core::{ConnectionState, IdentityResolver};
use relayline_proto::{SendResponse, StartResponse};

#[derive(Clone, Default)]
struct FuzzEnv(Arc<AtomicU64>);

impl Environment for FuzzEnv {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, _duration: Duration) -> impl Future<Output = ()> + Send {
        async {}
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        let n = self.0.fetch_add(1, Ordering::Relaxed).to_le_bytes();
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = n[i % n.len()];
        }
    }
}

#[derive(Debug, Clone, Arbitrary)]
enum Op {
    Open,
    StartOk,
    StartFailed,
    Opened { back: u8 },
    Closed { back: u8 },
    Failed { back: u8 },
    Advance { millis: u16 },
    Frame { back: u8, text: String },
    Ready { own: bool },
    Qr(String),
    Edit { recipient: String, text: Option<String> },
    Submit,
    Complete { ok: bool },
    Shutdown,
}

fuzz_target!(|ops: Vec<Op>| {
    let env = FuzzEnv::default();
    let Ok(identity) = IdentityResolver::new(env.clone()).resolve("U", "A") else {
        return;
    };
    let Ok(mut client) = Client::new(env, ClientConfig::default(), identity) else {
        return;
    };

    let base = Instant::now();
    let mut elapsed = Duration::ZERO;
    let mut attempt = 0u64;
    let mut in_flight = Vec::new();
    let mut reconnects = 0usize;
    let mut pairing_seen = false;

    for op in ops {
        let now = base + elapsed;
        let tagged = |back: u8| attempt.saturating_sub(u64::from(back % 3));
        let event = match op {
            Op::Open => ClientEvent::Open,
            Op::StartOk => ClientEvent::StartCompleted(StartResponse { client_id: "U_A".into() }),
            Op::StartFailed => ClientEvent::StartFailed(BackendError::Unreachable("down".into())),
            Op::Opened { back } => ClientEvent::ChannelOpened { attempt: tagged(back) },
            Op::Closed { back } => {
                ClientEvent::ChannelClosed { attempt: tagged(back), reason: None, now }
            },
            Op::Failed { back } => {
                ClientEvent::ChannelError { attempt: tagged(back), cause: "reset".into(), now }
            },
            Op::Advance { millis } => {
                elapsed += Duration::from_millis(u64::from(millis));
                ClientEvent::Tick { now: base + elapsed }
            },
            Op::Frame { back, text } => ClientEvent::ChannelFrame { attempt: tagged(back), text },
            Op::Ready { own } => {
                let id = if own { "U_A" } else { "X_Y" };
                ClientEvent::ChannelFrame {
                    attempt,
                    text: format!(r#"{{"type":"client_ready","clientId":"{id}"}}"#),
                }
            },
            Op::Qr(payload) => ClientEvent::ChannelFrame {
                attempt,
                text: format!(r#"{{"type":"qr","qr":{payload:?}}}"#),
            },
            Op::Edit { recipient, text } => {
                ClientEvent::EditDraft(OutboundDraft { recipient, text, media: None })
            },
            Op::Submit => ClientEvent::Submit,
            Op::Complete { ok } => match in_flight.pop() {
                Some(id) => ClientEvent::SendCompleted {
                    id,
                    result: if ok {
                        Ok(SendResponse { status: "sent".into() })
                    } else {
                        Err(BackendError::Rejected { status: 500, detail: "nope".into() })
                    },
                },
                None => ClientEvent::Tick { now },
            },
            Op::Shutdown => ClientEvent::Shutdown,
        };

        for action in client.handle(event) {
            match action {
                ClientAction::Connect { attempt: next, .. } => {
                    attempt = next;
                    reconnects = 0;
                },
                ClientAction::ReconnectScheduled { .. } => reconnects += 1,
                ClientAction::SubmitSend { id, .. } => in_flight.push(id),
                _ => {},
            }
        }

        let session = client.session();
        assert!(reconnects <= 1, "more than one reconnect scheduled per connection");
        if session.state() == ConnectionState::Connected {
            assert_eq!(session.client_id(), Some("U_A"));
        }
        if pairing_seen {
            assert!(session.pairing().is_some(), "pairing cleared");
        }
        pairing_seen = session.pairing().is_some();
    }
});
