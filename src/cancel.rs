//! External cancellation and timeout signal for scenario runs.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::Instant;

/// Why a run was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// [`CancelSignal::cancel`] was called.
    Requested,
    /// The signal's deadline passed.
    TimedOut,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requested => f.write_str("cancellation requested"),
            Self::TimedOut => f.write_str("timed out"),
        }
    }
}

/// A cloneable cancellation handle with an optional deadline.
///
/// Clones share the cancelled flag; each clone may carry its own deadline.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    tx: Arc<watch::Sender<bool>>,
    deadline: Option<Instant>,
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSignal {
    /// Create a signal that fires only when cancelled.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            deadline: None,
        }
    }

    /// Create a signal that fires after `timeout`.
    pub fn timeout(timeout: Duration) -> Self {
        Self::new().with_timeout(timeout)
    }

    /// Derive a signal sharing this one's flag, with the deadline tightened to `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        Self {
            tx: Arc::clone(&self.tx),
            deadline: Some(match self.deadline {
                Some(existing) => existing.min(candidate),
                None => candidate,
            }),
        }
    }

    /// Request cancellation of every run observing this signal.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Resolve when the signal fires.
    pub async fn cancelled(&self) -> CancelReason {
        let mut rx = self.tx.subscribe();
        let requested = async move {
            // The sender outlives this future, so `wait_for` only returns once cancelled.
            let _ = rx.wait_for(|cancelled| *cancelled).await;
        };

        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = requested => CancelReason::Requested,
                _ = tokio::time::sleep_until(deadline) => CancelReason::TimedOut,
            },
            None => {
                requested.await;
                CancelReason::Requested
            }
        }
    }
}
