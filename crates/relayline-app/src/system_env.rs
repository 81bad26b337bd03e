//! Production Environment implementation using system time and RNG.
//!
//! - Real system time (`std::time::Instant`) that advances naturally
//! - Thread-local RNG seeded from the OS. Not reproducible
//! - Tokio async sleep for actual wall-clock delays

use std::time::Duration;

use rand::RngCore;
use relayline_core::env::Environment;

/// Production environment using system time and OS-seeded randomness.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        rand::thread_rng().fill_bytes(buffer);
    }
}
