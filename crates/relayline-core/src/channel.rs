//! Push-channel lifecycle state machine.
//!
//! Tracks one logical connection to the gateway and owns the reconnect timer.
//! Uses the action pattern: methods take signals and time as input and return
//! actions for the driver to execute.
//!
//! Every physical connection try gets a fresh attempt number. Lifecycle
//! signals carry the attempt they belong to, so signals from a connection that
//! has already been replaced are recognized and dropped.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐  open   ┌─────────┐  opened  ┌──────┐
//! │ Idle │────────>│ Opening │─────────>│ Open │
//! └──────┘         └─────────┘          └──────┘
//!    ^                  │ closed/error      │ closed/error
//!    │ close            ↓                   ↓
//!    │             ┌────────┐  deadline  ┌───────────┐
//!    └─────────────│ Closed │───────────>│ Reconnect │──> Opening
//!                  └────────┘            └───────────┘
//! ```

use std::{
    ops::{Add, Sub},
    time::{Duration, Instant},
};

use url::Url;

use crate::{error::ChannelError, identity::SessionIdentity, reconnect::ReconnectPolicy};

/// Query parameter carrying the connection token.
pub const TOKEN_PARAM: &str = "webSocketId";

/// Actions returned by the channel state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelAction {
    /// Open a physical connection to `url`, tagging its signals with
    /// `attempt`. Any previous connection must be released first.
    Connect {
        /// Endpoint including the connection token
        url: String,
        /// Attempt number for the new connection
        attempt: u64,
    },

    /// Release the physical connection.
    Disconnect,

    /// A reconnect was scheduled after a drop.
    ScheduleReconnect {
        /// Time until the reconnect fires
        delay: Duration,
        /// Consecutive failures since the last successful open
        failures: u32,
    },

    /// The reconnect deadline passed; the owner should reopen the channel.
    Reconnect,

    /// A pending reconnect was cancelled.
    ReconnectCancelled,

    /// The reconnect policy ran out of attempts; the channel stays closed.
    GaveUp {
        /// Consecutive failures since the last successful open
        failures: u32,
    },
}

/// Channel lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelPhase {
    /// Never opened, or explicitly closed
    Idle,
    /// Connect issued, waiting for the opened signal
    Opening,
    /// Connection established
    Open,
    /// Connection dropped; a reconnect may be pending
    Closed,
}

/// Lifecycle signal reported by a physical connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSignal {
    /// Attempt the signal belongs to
    pub attempt: u64,
    /// What happened
    pub kind: SignalKind,
}

/// Kind of lifecycle signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalKind {
    /// Connection established
    Opened,
    /// One text frame received
    Frame(String),
    /// Connection closed by the peer or the network
    Closed {
        /// Close reason, if the peer sent one
        reason: Option<String>,
    },
    /// Connection failed
    Error {
        /// Failure description
        cause: String,
    },
}

/// Push-channel state machine
///
/// Pure: no I/O, no Environment storage. Time is passed as parameters to
/// methods that need it.
#[derive(Debug, Clone)]
pub struct Channel<I = Instant>
where
    I: Copy + Ord + Sub<Output = Duration> + Add<Duration, Output = I>,
{
    endpoint: Url,
    policy: ReconnectPolicy,
    phase: ChannelPhase,
    /// Attempt number of the most recent connect
    attempt: u64,
    /// Consecutive failures since the last successful open
    failures: u32,
    /// When the pending reconnect fires
    reconnect_at: Option<I>,
}

impl<I> Channel<I>
where
    I: Copy + Ord + Sub<Output = Duration> + Add<Duration, Output = I>,
{
    /// Create an idle channel for `endpoint`.
    ///
    /// # Errors
    ///
    /// - `ChannelError::InvalidUrl` if the endpoint does not parse
    pub fn new(endpoint: &str, policy: ReconnectPolicy) -> Result<Self, ChannelError> {
        let endpoint = Url::parse(endpoint).map_err(|e| ChannelError::InvalidUrl(e.to_string()))?;

        Ok(Self {
            endpoint,
            policy,
            phase: ChannelPhase::Idle,
            attempt: 0,
            failures: 0,
            reconnect_at: None,
        })
    }

    /// Current phase
    pub fn phase(&self) -> ChannelPhase {
        self.phase
    }

    /// Attempt number of the most recent connect (0 before the first).
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    /// Whether a connection is currently established
    pub fn is_open(&self) -> bool {
        self.phase == ChannelPhase::Open
    }

    /// Deadline of the pending reconnect, if any.
    pub fn reconnect_deadline(&self) -> Option<I> {
        self.reconnect_at
    }

    /// Endpoint URL for `identity`, with the connection token appended.
    pub fn url_for(&self, identity: &SessionIdentity) -> String {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair(TOKEN_PARAM, &identity.connection_token().to_string());
        url.into()
    }

    /// Begin a new connection attempt.
    ///
    /// Cancels any pending reconnect.
    ///
    /// # Errors
    ///
    /// - `ChannelError::InvalidState` if a connection is already opening or
    ///   open
    pub fn open(&mut self, identity: &SessionIdentity) -> Result<Vec<ChannelAction>, ChannelError> {
        if matches!(self.phase, ChannelPhase::Opening | ChannelPhase::Open) {
            return Err(ChannelError::InvalidState { phase: self.phase, operation: "open" });
        }

        let mut actions = Vec::with_capacity(2);
        if self.reconnect_at.take().is_some() {
            actions.push(ChannelAction::ReconnectCancelled);
        }
        actions.push(self.connect(identity));
        Ok(actions)
    }

    /// Handle the opened signal for `attempt`.
    ///
    /// Returns false if the signal is stale and was ignored.
    pub fn handle_opened(&mut self, attempt: u64) -> bool {
        if attempt != self.attempt || self.phase != ChannelPhase::Opening {
            return false;
        }

        self.phase = ChannelPhase::Open;
        self.failures = 0;
        true
    }

    /// Handle the closed signal for `attempt`.
    ///
    /// Schedules at most one reconnect per attempt. Stale and repeated signals
    /// return no actions.
    pub fn handle_closed(&mut self, attempt: u64, now: I) -> Vec<ChannelAction> {
        self.handle_lost(attempt, now)
    }

    /// Handle the error signal for `attempt`. Same semantics as a close.
    pub fn handle_error(&mut self, attempt: u64, now: I) -> Vec<ChannelAction> {
        self.handle_lost(attempt, now)
    }

    /// Whether `attempt` belongs to the current connection.
    pub fn is_current(&self, attempt: u64) -> bool {
        attempt == self.attempt && matches!(self.phase, ChannelPhase::Opening | ChannelPhase::Open)
    }

    /// Check that a frame can be sent right now.
    ///
    /// # Errors
    ///
    /// - `ChannelError::NotOpen` unless the channel is open
    pub fn check_send(&self) -> Result<(), ChannelError> {
        if self.phase == ChannelPhase::Open {
            Ok(())
        } else {
            Err(ChannelError::NotOpen { phase: self.phase })
        }
    }

    /// Fire the pending reconnect once its deadline passed.
    pub fn tick(&mut self, now: I) -> Vec<ChannelAction> {
        match self.reconnect_at {
            Some(deadline) if now >= deadline => {
                self.reconnect_at = None;
                vec![ChannelAction::Reconnect]
            },
            _ => Vec::new(),
        }
    }

    /// Explicit shutdown: cancel the pending reconnect and release the
    /// connection. The channel may be opened again afterwards.
    pub fn close(&mut self) -> Vec<ChannelAction> {
        let mut actions = Vec::with_capacity(2);
        if self.reconnect_at.take().is_some() {
            actions.push(ChannelAction::ReconnectCancelled);
        }
        if matches!(self.phase, ChannelPhase::Opening | ChannelPhase::Open) {
            actions.push(ChannelAction::Disconnect);
        }
        self.phase = ChannelPhase::Idle;
        self.failures = 0;
        actions
    }

    fn connect(&mut self, identity: &SessionIdentity) -> ChannelAction {
        self.attempt += 1;
        self.phase = ChannelPhase::Opening;
        ChannelAction::Connect { url: self.url_for(identity), attempt: self.attempt }
    }

    fn handle_lost(&mut self, attempt: u64, now: I) -> Vec<ChannelAction> {
        if !self.is_current(attempt) {
            return Vec::new();
        }

        self.phase = ChannelPhase::Closed;
        self.failures = self.failures.saturating_add(1);

        if !self.policy.allows(self.failures) {
            return vec![ChannelAction::GaveUp { failures: self.failures }];
        }

        let delay = self.policy.delay_for(self.failures);
        self.reconnect_at = Some(now + delay);
        vec![ChannelAction::ScheduleReconnect { delay, failures: self.failures }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{env::testing::TestEnv, identity::IdentityResolver};

    const GATEWAY: &str = "ws://localhost:8080/ws";

    fn identity() -> SessionIdentity {
        IdentityResolver::new(TestEnv::default()).resolve("u", "a").unwrap()
    }

    fn open_channel() -> Channel {
        let mut channel = Channel::new(GATEWAY, ReconnectPolicy::default()).unwrap();
        channel.open(&identity()).unwrap();
        assert!(channel.handle_opened(1));
        channel
    }

    #[test]
    fn open_appends_token_to_endpoint() {
        let identity = identity();
        let mut channel: Channel = Channel::new(GATEWAY, ReconnectPolicy::default()).unwrap();

        let actions = channel.open(&identity).unwrap();

        let expected = format!("{GATEWAY}?webSocketId={}", identity.connection_token());
        assert_eq!(actions, vec![ChannelAction::Connect { url: expected, attempt: 1 }]);
        assert_eq!(channel.phase(), ChannelPhase::Opening);
    }

    #[test]
    fn invalid_endpoint_is_rejected() {
        let result: Result<Channel, _> = Channel::new("not a url", ReconnectPolicy::default());
        assert!(matches!(result, Err(ChannelError::InvalidUrl(_))));
    }

    #[test]
    fn open_twice_is_invalid() {
        let mut channel = open_channel();
        let result = channel.open(&identity());

        assert_eq!(
            result,
            Err(ChannelError::InvalidState { phase: ChannelPhase::Open, operation: "open" })
        );
    }

    #[test]
    fn close_schedules_exactly_one_reconnect() {
        let t0 = Instant::now();
        let mut channel = open_channel();

        let actions = channel.handle_closed(1, t0);
        assert_eq!(
            actions,
            vec![ChannelAction::ScheduleReconnect {
                delay: Duration::from_millis(5000),
                failures: 1
            }]
        );

        // Duplicate close and a trailing error for the same attempt
        assert!(channel.handle_closed(1, t0).is_empty());
        assert!(channel.handle_error(1, t0).is_empty());
        assert_eq!(channel.reconnect_deadline(), Some(t0 + Duration::from_millis(5000)));
    }

    #[test]
    fn tick_fires_reconnect_only_after_deadline() {
        let t0 = Instant::now();
        let mut channel = open_channel();
        channel.handle_closed(1, t0);

        assert!(channel.tick(t0 + Duration::from_millis(4999)).is_empty());
        assert_eq!(channel.tick(t0 + Duration::from_millis(5000)), vec![ChannelAction::Reconnect]);
        assert!(channel.tick(t0 + Duration::from_millis(10_000)).is_empty());
        assert_eq!(channel.reconnect_deadline(), None);
    }

    #[test]
    fn open_cancels_pending_reconnect() {
        let t0 = Instant::now();
        let mut channel = open_channel();
        channel.handle_error(1, t0);

        let actions = channel.open(&identity()).unwrap();

        assert_eq!(actions[0], ChannelAction::ReconnectCancelled);
        assert!(matches!(actions[1], ChannelAction::Connect { attempt: 2, .. }));
        assert!(channel.tick(t0 + Duration::from_secs(60)).is_empty());
    }

    #[test]
    fn stale_attempt_signals_are_ignored() {
        let t0 = Instant::now();
        let mut channel = open_channel();
        channel.handle_closed(1, t0);
        channel.tick(t0 + Duration::from_millis(5000));
        channel.open(&identity()).unwrap();

        // Late signals from attempt 1
        assert!(!channel.handle_opened(1));
        assert!(channel.handle_closed(1, t0).is_empty());

        assert!(channel.handle_opened(2));
        assert!(channel.is_open());
    }

    #[test]
    fn close_cancels_and_disconnects() {
        let t0 = Instant::now();
        let mut channel = open_channel();
        assert_eq!(channel.close(), vec![ChannelAction::Disconnect]);

        channel.open(&identity()).unwrap();
        channel.handle_opened(2);
        channel.handle_closed(2, t0);
        assert_eq!(channel.close(), vec![ChannelAction::ReconnectCancelled]);
        assert_eq!(channel.reconnect_deadline(), None);
        assert_eq!(channel.phase(), ChannelPhase::Idle);
    }

    #[test]
    fn check_send_requires_open() {
        let mut channel: Channel = Channel::new(GATEWAY, ReconnectPolicy::default()).unwrap();
        assert_eq!(channel.check_send(), Err(ChannelError::NotOpen { phase: ChannelPhase::Idle }));

        channel.open(&identity()).unwrap();
        assert!(channel.check_send().is_err());

        channel.handle_opened(1);
        assert_eq!(channel.check_send(), Ok(()));
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let t0 = Instant::now();
        let policy = ReconnectPolicy::fixed(Duration::from_millis(10)).with_max_attempts(1);
        let mut channel = Channel::new(GATEWAY, policy).unwrap();
        let identity = identity();

        channel.open(&identity).unwrap();
        assert_eq!(channel.handle_error(1, t0).len(), 1);
        channel.tick(t0 + Duration::from_millis(10));

        // Never opened, so failures keep counting
        channel.open(&identity).unwrap();
        assert_eq!(channel.handle_error(2, t0), vec![ChannelAction::GaveUp { failures: 2 }]);
        assert_eq!(channel.reconnect_deadline(), None);
    }

    #[test]
    fn successful_open_resets_backoff() {
        let t0 = Instant::now();
        let policy =
            ReconnectPolicy::exponential(Duration::from_millis(100), Duration::from_secs(10));
        let mut channel = Channel::new(GATEWAY, policy).unwrap();
        let identity = identity();

        channel.open(&identity).unwrap();
        channel.handle_error(1, t0);
        channel.tick(t0 + Duration::from_secs(1));
        channel.open(&identity).unwrap();
        let second = channel.handle_error(2, t0);
        assert_eq!(
            second,
            vec![ChannelAction::ScheduleReconnect { delay: Duration::from_millis(200), failures: 2 }]
        );

        channel.tick(t0 + Duration::from_secs(1));
        channel.open(&identity).unwrap();
        channel.handle_opened(3);
        let after_open = channel.handle_closed(3, t0);
        assert_eq!(
            after_open,
            vec![ChannelAction::ScheduleReconnect { delay: Duration::from_millis(100), failures: 1 }]
        );
    }
}
