//! Secret reconnect tokens.

use rand::{RngCore, SeedableRng, rngs::StdRng};
use std::sync::{
    Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use super::constants::TOKEN_BYTES;

/// Hands out hex-encoded random tokens from a CSPRNG seeded by the OS.
#[derive(Debug)]
pub struct TokenGenerator {
    rng: Mutex<StdRng>,
    disposed: AtomicBool,
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
            disposed: AtomicBool::new(false),
        }
    }

    /// # Panics
    ///
    /// Panics if the generator has been disposed.
    #[must_use]
    pub fn generate(&self) -> String {
        assert!(
            !self.disposed.load(Ordering::Acquire),
            "token generator used after dispose"
        );
        let mut bytes = [0u8; TOKEN_BYTES];
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// # Panics
    ///
    /// Panics on a second call.
    pub fn dispose(&self) {
        assert!(
            !self.disposed.swap(true, Ordering::AcqRel),
            "token generator disposed twice"
        );
    }
}
