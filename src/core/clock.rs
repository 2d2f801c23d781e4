//! Monotonic Time Sources
//!
//! Every timing computation in the engine is derived from a [`MonotonicClock`].
//! Timestamps are offsets from a per-clock origin, never wall-clock readings,
//! so NTP corrections and timezone changes cannot move a running timer.
//!
//! - [`SystemClock`]: production clock backed by `std::time::Instant`
//! - [`ManualClock`]: virtual clock advanced explicitly (tests, replays)

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// A point on a monotonic timeline, in microseconds since the clock origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Clock origin.
    pub const ZERO: Timestamp = Timestamp(0);

    /// Create from microseconds since origin.
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    /// Create from milliseconds since origin.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis.saturating_mul(1_000))
    }

    /// Microseconds since origin.
    pub const fn as_micros(&self) -> u64 {
        self.0
    }

    /// Whole milliseconds elapsed from `earlier` to `self`.
    ///
    /// Saturates at zero if `earlier` is ahead.
    #[inline]
    pub fn millis_since(&self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0) / 1_000
    }
}

/// Non-decreasing time source.
///
/// Implementations must be `Send + Sync` so timers can be ticked from a
/// scheduler thread.
pub trait MonotonicClock: Send + Sync {
    /// Current timestamp. Never smaller than a previously returned value.
    fn now(&self) -> Timestamp;

    /// Milliseconds elapsed since `since`, measured against `now()`.
    #[inline]
    fn delta(&self, since: Timestamp) -> u64 {
        self.now().millis_since(since)
    }
}

impl<C: MonotonicClock + ?Sized> MonotonicClock for Arc<C> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

// =============================================================================
// SYSTEM CLOCK
// =============================================================================

/// Production clock using `Instant`, which the OS guarantees to be monotonic.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock whose origin is the current instant.
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for SystemClock {
    fn now(&self) -> Timestamp {
        let micros = self.origin.elapsed().as_micros();
        Timestamp(u64::try_from(micros).unwrap_or(u64::MAX))
    }
}

// =============================================================================
// MANUAL CLOCK
// =============================================================================

/// Virtual clock that only moves when told to.
///
/// Clones share the same underlying time, so a test can hold one handle
/// while a timer owns another.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    micros: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock at the origin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by `delta`.
    pub fn advance(&self, delta: Duration) {
        let micros = u64::try_from(delta.as_micros()).unwrap_or(u64::MAX);
        self.micros.fetch_add(micros, Ordering::SeqCst);
    }

    /// Advance by `millis` milliseconds.
    pub fn advance_ms(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    /// Move to `target`. Ignored if `target` is in the past.
    pub fn advance_to(&self, target: Timestamp) {
        self.micros.fetch_max(target.as_micros(), Ordering::SeqCst);
    }
}

impl MonotonicClock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.micros.load(Ordering::SeqCst))
    }
}
