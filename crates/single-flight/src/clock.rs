//! Time source used by the guard.
//!
//! Entries record the instant they were admitted and are considered expired
//! once `elapsed(acquired_at) >= ttl`. Production code uses [`SystemClock`];
//! tests drive a [`MockClock`] by hand so expiry never depends on real sleeps.

use std::time::Duration;

#[cfg(any(test, feature = "test-support"))]
use std::sync::{Arc, Mutex, PoisonError};

/// Reads the current instant and measures elapsed time from an earlier one.
///
/// The instant type is associated so that a mock can use a plain offset
/// instead of `std::time::Instant`, which cannot be constructed freely.
pub trait Clock: Send + Sync {
    type Instant: Copy + Send + Sync;

    fn now(&self) -> Self::Instant;

    /// Time since `since`. Saturates at zero if `since` lies in the future.
    fn elapsed(&self, since: Self::Instant) -> Duration;
}

/// Monotonic wall clock backed by `std::time::Instant`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Instant = std::time::Instant;

    #[inline]
    fn now(&self) -> std::time::Instant {
        std::time::Instant::now()
    }

    #[inline]
    fn elapsed(&self, since: std::time::Instant) -> Duration {
        since.elapsed()
    }
}

/// Hand-driven clock. Clones share the same time.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    current: Arc<Mutex<Duration>>,
}

#[cfg(any(test, feature = "test-support"))]
impl MockClock {
    /// Starts at offset zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) += by;
    }

    pub fn set(&self, to: Duration) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = to;
    }

    pub fn offset(&self) -> Duration {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Offset from the mock clock's epoch.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MockInstant(pub Duration);

#[cfg(any(test, feature = "test-support"))]
impl Clock for MockClock {
    type Instant = MockInstant;

    fn now(&self) -> MockInstant {
        MockInstant(self.offset())
    }

    fn elapsed(&self, since: MockInstant) -> Duration {
        self.offset().saturating_sub(since.0)
    }
}
