//! Relayline session client binary.
//!
//! # Usage
//!
//! ```bash
//! # Keep a session alive against a local gateway and backend
//! relayline --user U --agent A
//!
//! # Then type `<recipient>: <text>` lines to send messages
//! 15551234567: hello
//! ```
//!
//! Status changes, pairing codes and inbound messages are reported through
//! the log.

mod args;
mod error;
mod gateway;
mod input;

use clap::Parser;
use relayline_app::{Runtime, SessionHandle, SessionView, SystemEnv};
use relayline_client::{Client, OutboundDraft, http::HttpBackend};
use relayline_core::IdentityResolver;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::watch,
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    args::Args,
    error::CliError,
    gateway::GatewayDriver,
    input::{Input, parse_line},
};

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let env = SystemEnv::new();
    let identity = IdentityResolver::new(env).resolve(&args.user, &args.agent)?;
    info!(session = %identity.session_key(), gateway = %args.gateway, api = %args.api, "relayline starting");

    let client = Client::new(env, args.client_config(), identity)?;
    let backend = HttpBackend::new(&args.backend_config())?;
    let (runtime, handle) = Runtime::new(GatewayDriver::new(), backend, env, client);
    let runtime = tokio::spawn(runtime.run());
    let reporter = tokio::spawn(report(handle.subscribe()));

    handle.open().await?;
    let result = read_commands(&handle).await;

    // Shutdown is refused if the runtime already stopped on its own
    handle.shutdown().await.ok();
    drop(handle);
    let stopped = runtime.await;
    reporter.abort();

    result?;
    stopped??;
    info!("relayline stopped");
    Ok(())
}

/// Execute stdin commands until EOF, `/quit` or Ctrl-C.
async fn read_commands(handle: &SessionHandle) -> Result<(), CliError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            return Ok(());
        };

        match parse_line(&line) {
            Input::Send { to, text } => {
                let handle = handle.clone();
                tokio::spawn(async move {
                    match handle.send(OutboundDraft::text(to.clone(), text)).await {
                        Ok(ack) => info!(%to, status = %ack.status, "message sent"),
                        Err(failure) => warn!(%to, %failure, "message not sent"),
                    }
                });
            },
            Input::Open => handle.open().await?,
            Input::Status => info!(status = %handle.view().status_text(), "status"),
            Input::Quit => return Ok(()),
            Input::Empty => {},
            Input::Invalid(reason) => warn!(%reason, "ignoring input"),
        }
    }
}

/// Log every observable change of the session.
async fn report(mut views: watch::Receiver<SessionView>) {
    let mut seen = views.borrow_and_update().clone();

    while views.changed().await.is_ok() {
        let view = views.borrow_and_update().clone();

        if view.status != seen.status {
            info!(status = %view.status_text(), "session status");
        }
        if view.pairing != seen.pairing
            && let Some(pairing) = &view.pairing
        {
            info!(%pairing, "scan this pairing code to link the session");
        }
        for message in view.messages.iter().skip(seen.messages.len()) {
            match message.text() {
                Some(text) => info!(from = %message.sender, %text, "message"),
                None => info!(from = %message.sender, "media message"),
            }
        }

        seen = view;
    }
}
