//! Deterministic simulation harness for relayline sessions.
//!
//! Simulated implementations of the Environment, Driver and Backend seams for
//! deterministic, reproducible testing of the real runtime under a paused
//! tokio clock.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Invariants verify WHAT must be true across all event sequences, not
//! specific scenarios. Use [`InvariantRegistry::standard()`] for the session
//! invariants.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod scenario;
pub mod sim_backend;
pub mod sim_driver;
pub mod sim_env;

pub use invariants::{
    ConnectedMatchesIdentity, Invariant, InvariantRegistry, InvariantResult, PairingRetained,
    SessionSnapshot, SingleReconnect, Violation,
};
pub use scenario::{SIM_AGENT, SIM_SESSION_KEY, SIM_USER, SimSession};
pub use sim_backend::SimBackend;
pub use sim_driver::{ConnectRecord, SimDriver, SimDriverError, SimDriverHandle};
pub use sim_env::SimEnv;
