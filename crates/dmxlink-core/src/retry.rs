//! Retry policy used while the daemon is unreachable.

use std::time::Duration;

/// Default pause between two acquisition attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// Fixed-interval polling with no cap on attempts.
///
/// The daemon is expected to be local and only briefly absent, so the worker
/// keeps probing at the same pace until it connects or is stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    interval: Duration,
}

impl RetryPolicy {
    pub fn fixed(interval: Duration) -> Self {
        Self { interval }
    }

    /// Pause before every retry; it does not grow with the attempt count.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_RETRY_INTERVAL)
    }
}
