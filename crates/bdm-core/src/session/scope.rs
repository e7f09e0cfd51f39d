//! Shared cancellation signal for every transfer admitted in one epoch.
//!
//! Drivers capture the token that is current at admission time. A cancel-all
//! cancels that token and installs a fresh one, so already-running drivers
//! observe cancellation while later admissions get an untriggered signal.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use tokio_util::sync::CancellationToken;

/// Revocable cancel signal plus an epoch counter.
pub struct CancelScope {
    token: RwLock<CancellationToken>,
    generation: AtomicU64,
}

impl Default for CancelScope {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelScope {
    pub fn new() -> Self {
        Self {
            token: RwLock::new(CancellationToken::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// The active token. Captured once per admitted transfer; the clone
    /// stays tied to the epoch it was handed out in.
    pub fn signal(&self) -> CancellationToken {
        self.token.read().unwrap().clone()
    }

    /// Trigger every token handed out this epoch and install a fresh one.
    /// Cancellation is irreversible per token; only this swap produces a
    /// usable signal again.
    pub fn cancel_all(&self) {
        let mut token = self.token.write().unwrap();
        token.cancel();
        *token = CancellationToken::new();
        self.generation.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of cancel-all swaps so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Relaxed)
    }
}
