//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` stands in for the WebSocket transport. It records every
//! connect with the (paused) time it happened and captures written frames.
//! Tests steer it through a [`SimDriverHandle`]: inject lifecycle signals and
//! inbound frames, refuse connects, inspect what the runtime did. The same
//! [`relayline_app::Runtime`] code runs against it as in production.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use relayline_app::Driver;
use relayline_core::{ChannelSignal, SignalKind};
use tokio::{sync::mpsc, time::Instant};
use tracing::debug;

/// Error type for simulation driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimDriverError(pub String);

impl std::fmt::Display for SimDriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimDriverError: {}", self.0)
    }
}

impl std::error::Error for SimDriverError {}

/// One connect issued by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRecord {
    /// Requested URL
    pub url: String,
    /// Attempt tag
    pub attempt: u64,
    /// Simulated time of the call
    pub at: Instant,
}

#[derive(Default)]
struct SharedState {
    connects: Vec<ConnectRecord>,
    frames: Vec<String>,
    live: Option<u64>,
    disconnects: usize,
    auto_open: bool,
    refuse_connects: bool,
}

fn lock(state: &Mutex<SharedState>) -> MutexGuard<'_, SharedState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Simulation driver for deterministic testing.
pub struct SimDriver {
    state: Arc<Mutex<SharedState>>,
    signals_tx: mpsc::UnboundedSender<ChannelSignal>,
    signals: mpsc::UnboundedReceiver<ChannelSignal>,
}

impl Default for SimDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SimDriver {
    /// Create a driver that reports `Opened` as soon as a connect is issued.
    pub fn new() -> Self {
        let (signals_tx, signals) = mpsc::unbounded_channel();
        let state = SharedState { auto_open: true, ..SharedState::default() };
        Self { state: Arc::new(Mutex::new(state)), signals_tx, signals }
    }

    /// Create a driver that leaves opening to the test.
    #[must_use]
    pub fn manual() -> Self {
        let driver = Self::new();
        lock(&driver.state).auto_open = false;
        driver
    }

    /// Handle for steering the driver after it moved into the runtime.
    pub fn handle(&self) -> SimDriverHandle {
        SimDriverHandle { state: Arc::clone(&self.state), signals: self.signals_tx.clone() }
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;

    fn connect(&mut self, url: &str, attempt: u64) -> Result<(), Self::Error> {
        let mut state = lock(&self.state);
        if state.refuse_connects {
            return Err(SimDriverError(format!("connect refused for attempt {attempt}")));
        }

        debug!(attempt, url, "sim connect");
        state.connects.push(ConnectRecord { url: url.to_owned(), attempt, at: Instant::now() });
        state.live = Some(attempt);
        if state.auto_open {
            self.signals_tx.send(ChannelSignal { attempt, kind: SignalKind::Opened }).ok();
        }
        Ok(())
    }

    fn send_frame(&mut self, text: String) -> Result<(), Self::Error> {
        let mut state = lock(&self.state);
        if state.live.is_none() {
            return Err(SimDriverError("no live connection".into()));
        }
        state.frames.push(text);
        Ok(())
    }

    async fn next_signal(&mut self) -> ChannelSignal {
        match self.signals.recv().await {
            Some(signal) => signal,
            // Unreachable while the driver owns a sender
            None => std::future::pending().await,
        }
    }

    fn disconnect(&mut self) {
        let mut state = lock(&self.state);
        if state.live.take().is_some() {
            state.disconnects += 1;
        }
    }
}

/// Cloneable control surface of a [`SimDriver`].
#[derive(Clone)]
pub struct SimDriverHandle {
    state: Arc<Mutex<SharedState>>,
    signals: mpsc::UnboundedSender<ChannelSignal>,
}

impl SimDriverHandle {
    /// Inject a raw signal.
    pub fn inject(&self, signal: ChannelSignal) {
        self.signals.send(signal).ok();
    }

    /// Report that `attempt` opened.
    pub fn open(&self, attempt: u64) {
        self.inject(ChannelSignal { attempt, kind: SignalKind::Opened });
    }

    /// Deliver an inbound text frame on `attempt`.
    pub fn frame(&self, attempt: u64, text: impl Into<String>) {
        self.inject(ChannelSignal { attempt, kind: SignalKind::Frame(text.into()) });
    }

    /// Close `attempt` from the remote side.
    pub fn close(&self, attempt: u64) {
        lock(&self.state).live = None;
        self.inject(ChannelSignal { attempt, kind: SignalKind::Closed { reason: None } });
    }

    /// Fail `attempt` with `cause`.
    pub fn fail(&self, attempt: u64, cause: impl Into<String>) {
        lock(&self.state).live = None;
        self.inject(ChannelSignal { attempt, kind: SignalKind::Error { cause: cause.into() } });
    }

    /// Make later connects fail synchronously.
    pub fn refuse_connects(&self, refuse: bool) {
        lock(&self.state).refuse_connects = refuse;
    }

    /// Connects issued so far.
    pub fn connects(&self) -> Vec<ConnectRecord> {
        lock(&self.state).connects.clone()
    }

    /// Attempt of the live connection.
    pub fn live_attempt(&self) -> Option<u64> {
        lock(&self.state).live
    }

    /// Number of connections released by the runtime.
    pub fn disconnects(&self) -> usize {
        lock(&self.state).disconnects
    }

    /// Take all captured outgoing frames.
    pub fn take_frames(&self) -> Vec<String> {
        std::mem::take(&mut lock(&self.state).frames)
    }
}
