//! Simulated environment: paused tokio clock and seeded RNG.
//!
//! `SimEnv` uses `tokio::time::Instant`, so under a paused runtime
//! (`#[tokio::test(start_paused = true)]`) time only moves when every task is
//! idle or the test advances it. Randomness comes from a seeded ChaCha RNG;
//! the same seed yields the same connection tokens and send ids.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use relayline_core::env::Environment;

/// Seed used by [`SimEnv::default`].
pub const DEFAULT_SEED: u64 = 0x5eed;

/// Deterministic environment for simulation.
#[derive(Clone)]
pub struct SimEnv {
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl SimEnv {
    /// Create an environment whose RNG is seeded with `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self { rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))) }
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }
}

impl Environment for SimEnv {
    type Instant = tokio::time::Instant;

    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        // A panicking holder cannot leave the RNG in a torn state
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.fill_bytes(buffer);
    }
}
