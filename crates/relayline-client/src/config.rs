//! Client configuration.

use relayline_core::ReconnectPolicy;

use crate::composer::{DEFAULT_RECIPIENT_DOMAIN, SendRoute};

/// Default push-channel endpoint.
pub const DEFAULT_GATEWAY_URL: &str = "ws://localhost:3000";

/// Default sender label for messages we sent.
pub const DEFAULT_LOCAL_SENDER: &str = "You";

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Push-channel endpoint; the connection token is appended as a query
    /// parameter
    pub gateway_url: String,
    /// Domain appended to bare phone-number recipients
    pub recipient_domain: String,
    /// Sender label for locally authored log entries
    pub local_sender: String,
    /// Issue `POST /start` before opening the push channel
    pub bootstrap: bool,
    /// Channel used for outbound messages
    pub send_route: SendRoute,
    /// Reconnect delay policy
    pub reconnect: ReconnectPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway_url: DEFAULT_GATEWAY_URL.to_owned(),
            recipient_domain: DEFAULT_RECIPIENT_DOMAIN.to_owned(),
            local_sender: DEFAULT_LOCAL_SENDER.to_owned(),
            bootstrap: true,
            send_route: SendRoute::Http,
            reconnect: ReconnectPolicy::default(),
        }
    }
}
