//! Exclusive access to the shared connection
//!
//! Only one operation may talk to the target at a time. Holders keep a
//! [`BusyToken`] for as long as they read; dropping it releases the
//! connection on every exit path.

use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;

/// Non-reentrant lock serializing use of one connection
#[derive(Debug, Clone, Default)]
pub struct BusyLock {
    inner: Arc<Mutex<()>>,
}

/// Proof of exclusive access; released on drop
#[derive(Debug)]
pub struct BusyToken {
    _guard: OwnedMutexGuard<()>,
}

impl BusyLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for the connection, giving up when `token` is cancelled
    pub async fn acquire(&self, token: &CancellationToken) -> Option<BusyToken> {
        if token.is_cancelled() {
            return None;
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => None,
            guard = Arc::clone(&self.inner).lock_owned() => Some(BusyToken { _guard: guard }),
        }
    }

    /// Takes the connection only if nobody holds it
    pub fn try_acquire(&self) -> Option<BusyToken> {
        Arc::clone(&self.inner)
            .try_lock_owned()
            .ok()
            .map(|guard| BusyToken { _guard: guard })
    }

    pub fn is_busy(&self) -> bool {
        self.inner.try_lock().is_err()
    }
}
