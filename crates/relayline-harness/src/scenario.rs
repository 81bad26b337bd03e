//! Simulated session wiring for runtime-level tests.
//!
//! [`SimSession`] builds a [`Runtime`] from [`SimEnv`], [`SimDriver`] and
//! [`SimBackend`], spawns it on the current tokio runtime and keeps the
//! handles tests need to drive and observe it. Meant to run under paused time.

use relayline_app::{Runtime, RuntimeError, SessionHandle, SessionView};
use relayline_client::{Client, ClientConfig, ClientError};
use relayline_core::IdentityResolver;
use tokio::task::JoinHandle;

use crate::{SimBackend, SimDriver, SimDriverError, SimDriverHandle, SimEnv};

/// User id of simulated sessions.
pub const SIM_USER: &str = "U";

/// Agent id of simulated sessions.
pub const SIM_AGENT: &str = "A";

/// Session key the backend confirms for simulated sessions.
pub const SIM_SESSION_KEY: &str = "U_A";

/// Scheduler passes granted to the runtime by [`SimSession::settle`].
const SETTLE_PASSES: usize = 64;

/// A running simulated session.
pub struct SimSession {
    /// Command handle
    pub handle: SessionHandle,
    /// Driver control surface
    pub driver: SimDriverHandle,
    /// Scripted backend shared with the runtime
    pub backend: SimBackend,
    runtime: JoinHandle<Result<(), RuntimeError<SimDriverError>>>,
}

impl SimSession {
    /// Spawn a session with `config`, a self-opening driver and the default
    /// backend.
    pub fn start(config: ClientConfig) -> Result<Self, ClientError> {
        Self::start_with(config, SimDriver::new(), SimBackend::new(), SimEnv::default())
    }

    /// Spawn a session from explicit parts.
    pub fn start_with(
        config: ClientConfig,
        driver: SimDriver,
        backend: SimBackend,
        env: SimEnv,
    ) -> Result<Self, ClientError> {
        let identity = IdentityResolver::new(env.clone()).resolve(SIM_USER, SIM_AGENT)?;
        let client = Client::new(env.clone(), config, identity)?;

        let driver_handle = driver.handle();
        let (runtime, handle) = Runtime::new(driver, backend.clone(), env, client);
        let runtime = tokio::spawn(runtime.run());

        Ok(Self { handle, driver: driver_handle, backend, runtime })
    }

    /// Let the runtime and its backend tasks process everything queued.
    ///
    /// Only yields; the paused clock does not move.
    pub async fn settle(&self) {
        for _ in 0..SETTLE_PASSES {
            tokio::task::yield_now().await;
        }
    }

    /// Latest published view.
    pub fn view(&self) -> SessionView {
        self.handle.view()
    }

    /// Deliver `client_ready` for our own identity on the live attempt.
    pub async fn confirm_ready(&self) {
        if let Some(attempt) = self.driver.live_attempt() {
            self.driver.frame(
                attempt,
                format!(r#"{{"type":"client_ready","clientId":"{SIM_SESSION_KEY}"}}"#),
            );
        }
        self.settle().await;
    }

    /// Shut down and wait for the runtime to exit.
    pub async fn stop(self) -> Result<(), RuntimeError<SimDriverError>> {
        // A runtime that already stopped refuses the command
        self.handle.shutdown().await.ok();
        self.release().await
    }

    /// Drop this session's handle and wait for the runtime to exit.
    ///
    /// The runtime stops on its own once no other handle clone is alive.
    pub async fn release(self) -> Result<(), RuntimeError<SimDriverError>> {
        let Self { handle, runtime, .. } = self;
        drop(handle);

        match runtime.await {
            Ok(result) => result,
            Err(err) => Err(RuntimeError::Driver(SimDriverError(format!("runtime task: {err}")))),
        }
    }
}
