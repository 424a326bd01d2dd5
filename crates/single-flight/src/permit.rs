//! Scoped ownership of an admitted key.
//!
//! A [`Permit`] releases its key on drop, so early returns, `?` and panics in
//! the protected operation all free the key. It only releases the admission
//! it was issued for: if its entry expired and another caller was admitted
//! under the same key, dropping the old permit leaves the new entry alone.

use std::fmt;
use std::time::Duration;

use crate::clock::Clock;
use crate::guard::SingleFlight;
use crate::key::GuardKey;

#[must_use = "dropping a permit releases the key immediately"]
pub struct Permit<'a, C: Clock> {
    guard: &'a SingleFlight<C>,
    key: GuardKey,
    generation: u64,
    armed: bool,
}

impl<'a, C: Clock> Permit<'a, C> {
    pub(crate) fn new(guard: &'a SingleFlight<C>, key: GuardKey, generation: u64) -> Self {
        Self {
            guard,
            key,
            generation,
            armed: true,
        }
    }

    pub fn key(&self) -> &GuardKey {
        &self.key
    }

    /// Time left on this admission, or `None` once it expired or was taken
    /// over by a newer admission.
    pub fn remaining(&self) -> Option<Duration> {
        if self.is_current() {
            self.guard.remaining(&self.key)
        } else {
            None
        }
    }

    fn is_current(&self) -> bool {
        self.guard.generation_of(&self.key) == Some(self.generation)
    }

    /// Releases now. Returns whether this permit still owned the key.
    pub fn release(mut self) -> bool {
        self.armed = false;
        self.guard.release_generation(&self.key, self.generation)
    }

    /// Gives up the permit without releasing; the entry stays until its ttl
    /// elapses. Turns the admission into a cooldown.
    pub fn hold(mut self) {
        self.armed = false;
    }
}

impl<C: Clock> Drop for Permit<'_, C> {
    fn drop(&mut self) {
        if self.armed {
            self.guard.release_generation(&self.key, self.generation);
        }
    }
}

impl<C: Clock> fmt::Debug for Permit<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Permit")
            .field("key", &self.key)
            .field("generation", &self.generation)
            .field("armed", &self.armed)
            .finish()
    }
}
