//! Driver trait for abstracting push-channel I/O.
//!
//! The [`Driver`] trait decouples the runtime from a specific transport. The
//! production driver wraps the WebSocket transport, the simulation driver
//! records connects and lets tests inject signals, while the generic
//! [`crate::Runtime`] handles all orchestration.

use std::future::Future;

use relayline_core::ChannelSignal;

/// Abstracts push-channel I/O for the runtime.
///
/// # Implementations
///
/// - **CLI**: tokio-tungstenite WebSocket per attempt
/// - **Simulation**: in-memory signal queue with a paused clock
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Open a connection to `url`, tagging its signals with `attempt`.
    ///
    /// Must not block; completion is reported through
    /// [`next_signal`](Driver::next_signal). Any previous connection is
    /// released first.
    ///
    /// # Errors
    ///
    /// Returns an error if no connection can even be attempted.
    fn connect(&mut self, url: &str, attempt: u64) -> Result<(), Self::Error>;

    /// Write a text frame to the current connection.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no live connection.
    fn send_frame(&mut self, text: String) -> Result<(), Self::Error>;

    /// Wait for the next lifecycle signal. Pends while nothing happens.
    fn next_signal(&mut self) -> impl Future<Output = ChannelSignal> + Send;

    /// Release the current connection, if any. Idempotent.
    fn disconnect(&mut self);
}
