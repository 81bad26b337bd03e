//! Application layer for relayline
//!
//! Generic runtime that runs a [`relayline_client::Client`] against real or
//! simulated I/O, enabling deterministic simulation testing with the same code
//! that runs in production.
//!
//! # Components
//!
//! - [`Driver`]: Trait for push-channel I/O abstraction
//! - [`Runtime`]: Generic orchestration loop using Driver and Backend
//! - [`SessionHandle`]: Cloneable command API
//! - [`SessionView`]: Observable session state
//! - [`SystemEnv`]: Production environment

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod driver;
mod handle;
mod runtime;
mod system_env;
mod view;

pub use driver::Driver;
pub use handle::{HandleError, SESSION_STOPPED, SendOutcome, SessionHandle};
pub use runtime::{Runtime, RuntimeError};
pub use system_env::SystemEnv;
pub use view::SessionView;
