//! Property-based tests for the channel and session state machines driven
//! together.
//!
//! Arbitrary interleavings of lifecycle signals (including stale attempts),
//! protocol events and time must keep the session consistent:
//!
//! - At most one reconnect is pending at any time
//! - `Connected` implies an open channel and the session's own identity
//! - Once shown, a pairing artifact is never cleared

use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use proptest::prelude::*;
use relayline_core::{
    Channel, ChannelAction, ConnectionState, IdentityResolver, ReconnectPolicy, Session,
    env::Environment,
};
use relayline_proto::ProtocolEvent;

#[derive(Clone, Default)]
struct CountingEnv(Arc<AtomicU64>);

impl Environment for CountingEnv {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, _duration: Duration) -> impl Future<Output = ()> + Send {
        async {}
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        let n = self.0.fetch_add(1, Ordering::Relaxed).to_be_bytes();
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = n[i % n.len()];
        }
    }
}

#[derive(Debug, Clone)]
enum Input {
    Open,
    Opened { stale: bool },
    Closed { stale: bool },
    Error,
    Advance(u64),
    Qr(String),
    Ready { own: bool },
    ServerError,
    StateChange,
    Shutdown,
}

fn input() -> impl Strategy<Value = Input> {
    prop_oneof![
        Just(Input::Open),
        any::<bool>().prop_map(|stale| Input::Opened { stale }),
        any::<bool>().prop_map(|stale| Input::Closed { stale }),
        Just(Input::Error),
        (0u64..8000).prop_map(Input::Advance),
        "[A-Z]{1,4}".prop_map(Input::Qr),
        any::<bool>().prop_map(|own| Input::Ready { own }),
        Just(Input::ServerError),
        Just(Input::StateChange),
        Just(Input::Shutdown),
    ]
}

struct World {
    channel: Channel,
    session: Session,
    identity: relayline_core::SessionIdentity,
    now: Instant,
}

impl World {
    fn new() -> Self {
        let identity = IdentityResolver::new(CountingEnv::default()).resolve("U", "A").unwrap();
        Self {
            channel: Channel::new("ws://gateway.test/ws", ReconnectPolicy::default()).unwrap(),
            session: Session::new(identity.clone()),
            identity,
            now: Instant::now(),
        }
    }

    fn open(&mut self) {
        if self.channel.open(&self.identity).is_ok() {
            self.session.begin_connecting();
        }
    }

    fn apply(&mut self, input: Input) -> Vec<ChannelAction> {
        let current = self.channel.attempt();
        let stale_attempt = current.saturating_sub(1);
        match input {
            Input::Open => {
                self.open();
                Vec::new()
            },
            Input::Opened { stale } => {
                let attempt = if stale { stale_attempt } else { current };
                if self.channel.handle_opened(attempt) {
                    self.session.handle_channel_opened();
                }
                Vec::new()
            },
            Input::Closed { stale } => {
                let attempt = if stale { stale_attempt } else { current };
                let was_current = self.channel.is_current(attempt);
                let actions = self.channel.handle_closed(attempt, self.now);
                if was_current {
                    self.session.handle_channel_lost(None);
                }
                actions
            },
            Input::Error => {
                let was_current = self.channel.is_current(current);
                let actions = self.channel.handle_error(current, self.now);
                if was_current {
                    self.session.handle_channel_lost(Some("boom".into()));
                }
                actions
            },
            Input::Advance(ms) => {
                self.now += Duration::from_millis(ms);
                let actions = self.channel.tick(self.now);
                if actions.contains(&ChannelAction::Reconnect) {
                    self.open();
                }
                actions
            },
            Input::Qr(payload) => {
                self.session.handle_event(&ProtocolEvent::Qr { payload });
                Vec::new()
            },
            Input::Ready { own } => {
                let client_id = if own { "U_A" } else { "X_A" }.to_owned();
                self.session.handle_event(&ProtocolEvent::ClientReady { client_id });
                Vec::new()
            },
            Input::ServerError => {
                self.session.handle_event(&ProtocolEvent::Error { detail: "bad".into() });
                Vec::new()
            },
            Input::StateChange => {
                self.session.handle_event(&ProtocolEvent::StateChange { detail: "S".into() });
                Vec::new()
            },
            Input::Shutdown => {
                let actions = self.channel.close();
                self.session.handle_shutdown();
                actions
            },
        }
    }
}

proptest! {
    #[test]
    fn prop_lifecycle_invariants(inputs in prop::collection::vec(input(), 0..64)) {
        let mut world = World::new();
        let mut pairing_seen = false;

        for input in inputs {
            let had_pending = world.channel.reconnect_deadline().is_some();
            let actions = world.apply(input);

            // PROPERTY: a drop never schedules over an existing reconnect
            let scheduled = actions
                .iter()
                .filter(|a| matches!(a, ChannelAction::ScheduleReconnect { .. }))
                .count();
            prop_assert!(scheduled <= 1);
            if had_pending {
                prop_assert_eq!(scheduled, 0);
            }

            // PROPERTY: Connected only with an open channel and own identity
            if world.session.state() == ConnectionState::Connected {
                prop_assert!(world.channel.is_open());
                prop_assert_eq!(world.session.client_id(), Some("U_A"));
            }

            // PROPERTY: pairing artifact is never cleared
            if pairing_seen {
                prop_assert!(world.session.pairing().is_some());
            }
            pairing_seen |= world.session.pairing().is_some();
        }
    }

    #[test]
    fn prop_foreign_ready_never_connects(
        ids in prop::collection::vec("[A-Z]{1,3}_[A-Z]{1,3}", 1..16),
    ) {
        let mut world = World::new();
        world.open();
        world.apply(Input::Opened { stale: false });

        for client_id in ids.into_iter().filter(|id| id != "U_A") {
            world.session.handle_event(&ProtocolEvent::ClientReady { client_id });
            prop_assert_eq!(world.session.state(), ConnectionState::Connecting);
        }
    }
}
