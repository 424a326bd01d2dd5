//! The single-flight guard: at most one admitted unit of work per key.
//!
//! All state lives in one table behind one mutex. Every operation takes the
//! lock once, does a single map operation and returns; nothing here awaits,
//! so the guard is safe to call from async handlers without yielding.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::entry::{EntryState, GuardEntry};
use crate::key::GuardKey;
use crate::permit::Permit;

/// Shortest ttl an entry can be admitted with.
pub const DEFAULT_MIN_TTL: Duration = Duration::from_millis(1);

/// Longest ttl an entry can be admitted with.
pub const DEFAULT_MAX_TTL: Duration = Duration::from_secs(600);

/// Bounds applied to every requested ttl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardConfig {
    pub min_ttl: Duration,
    pub max_ttl: Duration,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            min_ttl: DEFAULT_MIN_TTL,
            max_ttl: DEFAULT_MAX_TTL,
        }
    }
}

impl GuardConfig {
    pub fn with_max_ttl(mut self, max_ttl: Duration) -> Self {
        self.max_ttl = max_ttl;
        self
    }

    /// Clamps `ttl` into `[min_ttl, max_ttl]`. A `max_ttl` below `min_ttl`
    /// is treated as `min_ttl`.
    pub fn clamp(&self, ttl: Duration) -> Duration {
        let max = self.max_ttl.max(self.min_ttl);
        ttl.clamp(self.min_ttl, max)
    }
}

/// Outcome of [`SingleFlight::submit`].
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The caller owns the key until it releases or the ttl elapses.
    Admitted,
    /// Another unit of work holds the key; do not perform the side effect.
    Rejected(Rejected),
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

/// A submit that lost to an in-flight entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejected {
    /// Time until the blocking entry expires on its own.
    pub retry_after: Duration,
}

impl Rejected {
    /// `retry_after` rounded up to whole seconds, never below one.
    pub fn retry_after_secs(&self) -> u64 {
        let secs = self.retry_after.as_secs();
        let rounded = if self.retry_after.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        };
        rounded.max(1)
    }
}

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "already in flight, retry in {}s",
            self.retry_after_secs()
        )
    }
}

struct Table<I: Copy> {
    entries: HashMap<GuardKey, GuardEntry<I>>,
    next_generation: u64,
}

/// Process-wide admission table keyed by [`GuardKey`].
///
/// Construct one at startup and share it behind an `Arc`.
pub struct SingleFlight<C: Clock = SystemClock> {
    clock: C,
    config: GuardConfig,
    table: Mutex<Table<C::Instant>>,
}

impl SingleFlight<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock, GuardConfig::default())
    }

    pub fn with_config(config: GuardConfig) -> Self {
        Self::with_clock(SystemClock, config)
    }
}

impl Default for SingleFlight<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> SingleFlight<C> {
    pub fn with_clock(clock: C, config: GuardConfig) -> Self {
        Self {
            clock,
            config,
            table: Mutex::new(Table {
                entries: HashMap::new(),
                next_generation: 1,
            }),
        }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    // Each critical section is one map operation, so a panic elsewhere
    // cannot leave the table half-updated.
    fn lock(&self) -> MutexGuard<'_, Table<C::Instant>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admits `key` for `ttl` (clamped) unless an unexpired entry holds it.
    ///
    /// An expired entry found here is replaced in place.
    pub fn submit(&self, key: &GuardKey, ttl: Duration) -> Admission {
        match self.admit(key, ttl) {
            Ok(_) => Admission::Admitted,
            Err(rejected) => Admission::Rejected(rejected),
        }
    }

    /// Like [`submit`](Self::submit), but returns a [`Permit`] that releases
    /// the key when dropped.
    pub fn acquire(&self, key: &GuardKey, ttl: Duration) -> Result<Permit<'_, C>, Rejected> {
        let generation = self.admit(key, ttl)?;
        Ok(Permit::new(self, key.clone(), generation))
    }

    fn admit(&self, key: &GuardKey, ttl: Duration) -> Result<u64, Rejected> {
        let ttl = self.config.clamp(ttl);
        let mut table = self.lock();

        if let Some(existing) = table.entries.get(key) {
            if !existing.is_expired(&self.clock) {
                return Err(Rejected {
                    retry_after: existing.remaining(&self.clock),
                });
            }
        }

        let generation = table.next_generation;
        table.next_generation += 1;
        table
            .entries
            .insert(key.clone(), GuardEntry::new(self.clock.now(), ttl, generation));
        Ok(generation)
    }

    /// Frees `key`. Releasing an unknown or expired key is a no-op.
    pub fn release(&self, key: &GuardKey) {
        self.lock().entries.remove(key);
    }

    /// Frees `key` only if it is still held by the admission numbered
    /// `generation`. Returns whether an entry was removed.
    pub(crate) fn release_generation(&self, key: &GuardKey, generation: u64) -> bool {
        let mut table = self.lock();
        match table.entries.get(key) {
            Some(entry) if entry.generation == generation => {
                table.entries.remove(key);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn generation_of(&self, key: &GuardKey) -> Option<u64> {
        self.lock().entries.get(key).map(|entry| entry.generation)
    }

    /// Advisory check with the same expiry rule as `submit`. Does not evict.
    pub fn is_locked(&self, key: &GuardKey) -> bool {
        self.state(key).is_locked()
    }

    /// Time until `key` frees itself, or `None` if it is not locked.
    pub fn remaining(&self, key: &GuardKey) -> Option<Duration> {
        match self.state(key) {
            EntryState::Active { remaining } => Some(remaining),
            EntryState::Unlocked | EntryState::Expired => None,
        }
    }

    pub fn state(&self, key: &GuardKey) -> EntryState {
        self.lock()
            .entries
            .get(key)
            .map_or(EntryState::Unlocked, |entry| entry.state(&self.clock))
    }

    /// Evicts every expired entry. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let mut table = self.lock();
        let before = table.entries.len();
        table
            .entries
            .retain(|_, entry| !entry.is_expired(&self.clock));
        before - table.entries.len()
    }

    /// Entries currently stored, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries that would reject a submit right now.
    pub fn active_count(&self) -> usize {
        self.lock()
            .entries
            .values()
            .filter(|entry| !entry.is_expired(&self.clock))
            .count()
    }
}

impl<C: Clock> fmt::Debug for SingleFlight<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleFlight")
            .field("config", &self.config)
            .field("entries", &self.len())
            .finish()
    }
}
