//! Production driver over the WebSocket transport.

use relayline_app::Driver;
use relayline_client::transport::{self, ChannelHandle, TransportError};
use relayline_core::ChannelSignal;
use tokio::sync::mpsc;

/// [`Driver`] that opens one tokio-tungstenite connection per attempt.
///
/// All attempts report into one signal queue; signals of replaced attempts
/// are left for the client to discard as stale.
pub struct GatewayDriver {
    signals_tx: mpsc::UnboundedSender<ChannelSignal>,
    signals: mpsc::UnboundedReceiver<ChannelSignal>,
    channel: Option<ChannelHandle>,
}

impl GatewayDriver {
    /// Create a driver with no connection.
    pub fn new() -> Self {
        let (signals_tx, signals) = mpsc::unbounded_channel();
        Self { signals_tx, signals, channel: None }
    }
}

impl Default for GatewayDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver for GatewayDriver {
    type Error = TransportError;

    fn connect(&mut self, url: &str, attempt: u64) -> Result<(), Self::Error> {
        self.disconnect();
        self.channel = Some(transport::connect(url.to_owned(), attempt, self.signals_tx.clone()));
        Ok(())
    }

    fn send_frame(&mut self, text: String) -> Result<(), Self::Error> {
        match &self.channel {
            Some(channel) => channel.send(text),
            None => Err(TransportError::Closed),
        }
    }

    async fn next_signal(&mut self) -> ChannelSignal {
        match self.signals.recv().await {
            Some(signal) => signal,
            // The driver keeps a sender alive, so the queue never closes
            None => std::future::pending().await,
        }
    }

    fn disconnect(&mut self) {
        if let Some(channel) = self.channel.take() {
            tracing::debug!(attempt = channel.attempt(), "releasing connection");
            channel.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_without_connection_are_refused() {
        let mut driver = GatewayDriver::new();

        assert_eq!(driver.send_frame("x".into()), Err(TransportError::Closed));
    }

    #[tokio::test]
    async fn refused_gateway_reports_error_signal() {
        let mut driver = GatewayDriver::new();

        // Nothing listens on port 1
        assert!(driver.connect("ws://127.0.0.1:1/", 1).is_ok());
        let signal = driver.next_signal().await;

        assert_eq!(signal.attempt, 1);
        assert!(matches!(signal.kind, relayline_core::SignalKind::Error { .. }));
        driver.disconnect();
    }
}
