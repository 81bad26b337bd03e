//! Command-line arguments.

use std::time::Duration;

use clap::Parser;
use relayline_client::{
    ClientConfig, DEFAULT_GATEWAY_URL, SendRoute,
    http::{DEFAULT_API_URL, HttpBackendConfig},
};
use relayline_core::ReconnectPolicy;

/// Headless relay session client
#[derive(Parser, Debug)]
#[command(name = "relayline")]
#[command(about = "Keep a chat-relay session alive and send messages from stdin")]
#[command(version)]
pub struct Args {
    /// Push-channel gateway URL
    #[arg(long, default_value = DEFAULT_GATEWAY_URL)]
    pub gateway: String,

    /// Backend API base URL
    #[arg(long, default_value = DEFAULT_API_URL)]
    pub api: String,

    /// User id
    #[arg(short, long)]
    pub user: String,

    /// Agent id
    #[arg(short, long)]
    pub agent: String,

    /// Delay before reconnecting after a drop
    #[arg(long, default_value = "5000")]
    pub reconnect_delay_ms: u64,

    /// Grow the reconnect delay exponentially up to this cap
    #[arg(long)]
    pub reconnect_max_delay_ms: Option<u64>,

    /// Give up after this many consecutive failed connections
    #[arg(long)]
    pub max_reconnects: Option<u32>,

    /// Connect without calling `start` first
    #[arg(long)]
    pub no_bootstrap: bool,

    /// Send over the push channel instead of the HTTP API
    #[arg(long)]
    pub send_over_channel: bool,

    /// Per-request timeout for the HTTP API
    #[arg(long, default_value = "30")]
    pub request_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Reconnect policy from the delay flags.
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        let delay = Duration::from_millis(self.reconnect_delay_ms);
        let policy = match self.reconnect_max_delay_ms {
            Some(max) => ReconnectPolicy::exponential(delay, Duration::from_millis(max)),
            None => ReconnectPolicy::fixed(delay),
        };

        match self.max_reconnects {
            Some(max) => policy.with_max_attempts(max),
            None => policy,
        }
    }

    /// Client configuration.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            gateway_url: self.gateway.clone(),
            bootstrap: !self.no_bootstrap,
            send_route: if self.send_over_channel { SendRoute::Channel } else { SendRoute::Http },
            reconnect: self.reconnect_policy(),
            ..ClientConfig::default()
        }
    }

    /// HTTP backend configuration.
    pub fn backend_config(&self) -> HttpBackendConfig {
        HttpBackendConfig {
            base_url: self.api.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}
