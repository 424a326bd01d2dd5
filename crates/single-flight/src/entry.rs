//! Table entries and their lifecycle.

use std::time::Duration;

use crate::clock::Clock;

/// One admitted unit of work.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GuardEntry<I: Copy> {
    pub(crate) acquired_at: I,
    pub(crate) ttl: Duration,
    pub(crate) generation: u64,
}

impl<I: Copy> GuardEntry<I> {
    pub(crate) fn new(acquired_at: I, ttl: Duration, generation: u64) -> Self {
        Self {
            acquired_at,
            ttl,
            generation,
        }
    }

    /// `now >= acquired_at + ttl`.
    pub(crate) fn is_expired<C: Clock<Instant = I>>(&self, clock: &C) -> bool {
        clock.elapsed(self.acquired_at) >= self.ttl
    }

    /// Time left before expiry, zero once expired.
    pub(crate) fn remaining<C: Clock<Instant = I>>(&self, clock: &C) -> Duration {
        self.ttl.saturating_sub(clock.elapsed(self.acquired_at))
    }

    pub(crate) fn state<C: Clock<Instant = I>>(&self, clock: &C) -> EntryState {
        let remaining = self.remaining(clock);
        if remaining.is_zero() {
            EntryState::Expired
        } else {
            EntryState::Active { remaining }
        }
    }
}

/// Observable state of a key.
///
/// Released entries are removed from the table on release, so a released
/// key reads back as [`Unlocked`](EntryState::Unlocked). An expired entry is
/// reported as [`Expired`](EntryState::Expired) until a submit or sweep
/// evicts it; either way it no longer blocks admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Unlocked,
    Active { remaining: Duration },
    Expired,
}

impl EntryState {
    /// Whether a `submit` for this key would be rejected right now.
    pub fn is_locked(&self) -> bool {
        matches!(self, EntryState::Active { .. })
    }
}
