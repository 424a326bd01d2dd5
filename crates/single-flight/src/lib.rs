//! In-memory single-flight guard.
//!
//! Guarantees at most one in-flight unit of work per [`GuardKey`] within a
//! bounded window. A caller submits a key with a ttl and gets back
//! [`Admission::Admitted`] or [`Admission::Rejected`]; an admitted entry is
//! freed by [`SingleFlight::release`] or, if the caller never gets there, by
//! its ttl running out. Nothing waits: rejection is an ordinary return value
//! and every call finishes in near-constant time under a single mutex.
//!
//! | Concern | Type |
//! |---------|------|
//! | Admission table | [`SingleFlight`] |
//! | Key validation | [`GuardKey`], [`InvalidKey`] |
//! | Release on every exit path | [`Permit`] via [`SingleFlight::acquire`] |
//! | Eviction of abandoned keys | [`Sweeper`] |
//! | Time | [`Clock`], [`SystemClock`], `MockClock`* |
//!
//! *Available with `#[cfg(test)]` or the `"test-support"` feature.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use single_flight::{GuardKey, SingleFlight};
//!
//! let guard = SingleFlight::new();
//! let key = GuardKey::compose("ticket_create", [42u64]).unwrap();
//!
//! let permit = guard.acquire(&key, Duration::from_secs(30)).unwrap();
//! assert!(guard.acquire(&key, Duration::from_secs(30)).is_err());
//! drop(permit);
//! assert!(!guard.is_locked(&key));
//! ```

pub mod clock;
mod entry;
pub mod error;
mod guard;
mod key;
mod permit;
mod sweeper;

#[cfg(any(test, feature = "test-support"))]
pub use clock::{MockClock, MockInstant};
pub use clock::{Clock, SystemClock};
pub use entry::EntryState;
pub use error::InvalidKey;
pub use guard::{
    Admission, DEFAULT_MAX_TTL, DEFAULT_MIN_TTL, GuardConfig, Rejected, SingleFlight,
};
pub use key::{GuardKey, MAX_KEY_LEN};
pub use permit::Permit;
pub use sweeper::{DEFAULT_SWEEP_INTERVAL, Sweeper};
