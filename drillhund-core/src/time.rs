//! ## drillhund-core::time
//! **Injectable clocks**
//!
//! Delivery timing never reads the wall clock directly. The scheduler asks a
//! `Clock` for `now_ns()`, so production runs on a monotonic clock while tests
//! and deterministic replays drive a manually advanced virtual clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

pub const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Converts a relative offset in seconds to nanoseconds, clamping negatives
/// to zero.
#[inline]
pub fn secs_to_ns(secs: f64) -> u64 {
    if secs <= 0.0 {
        return 0;
    }
    (secs * NANOS_PER_SEC as f64) as u64
}

/// Monotonic time source with nanosecond resolution.
pub trait Clock: Send + Sync {
    fn now_ns(&self) -> u64;
}

/// Deterministic clock for simulation and tests. Advances only when told to.
#[derive(Clone)]
pub struct VirtualClock {
    offset: Arc<AtomicU64>,
}

impl VirtualClock {
    /// Creates a new virtual clock with the given seed (starting time).
    pub fn new(seed: u64) -> Self {
        Self {
            offset: Arc::new(AtomicU64::new(seed)),
        }
    }

    /// Advances the virtual clock by the given number of nanoseconds.
    #[inline]
    pub fn advance(&self, ns: u64) {
        self.offset.fetch_add(ns, Ordering::Release);
    }

    /// Advances by a relative offset expressed in seconds.
    #[inline]
    pub fn advance_secs(&self, secs: f64) {
        self.advance(secs_to_ns(secs));
    }
}

impl Clock for VirtualClock {
    #[inline]
    fn now_ns(&self) -> u64 {
        self.offset.load(Ordering::Acquire)
    }
}

/// Real monotonic clock measured from construction.
#[derive(Clone)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now_ns(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_clock_initial_value() {
        let clock = VirtualClock::new(100);
        assert_eq!(clock.now_ns(), 100);
    }

    #[test]
    fn virtual_clock_advances() {
        let clock = VirtualClock::new(0);
        clock.advance(500);
        assert_eq!(clock.now_ns(), 500);
        clock.advance_secs(1.5);
        assert_eq!(clock.now_ns(), 500 + 1_500_000_000);
    }

    #[test]
    fn virtual_clock_handles_share() {
        let clock = VirtualClock::new(0);
        let shared = clock.clone();
        clock.advance(42);
        assert_eq!(shared.now_ns(), 42);
    }

    #[test]
    fn negative_offsets_clamp_to_zero() {
        assert_eq!(secs_to_ns(-3.0), 0);
        assert_eq!(secs_to_ns(0.0), 0);
        assert_eq!(secs_to_ns(2.0), 2 * NANOS_PER_SEC);
    }

    #[test]
    fn monotonic_clock_does_not_go_backwards() {
        let clock = MonotonicClock::new();
        let a = clock.now_ns();
        let b = clock.now_ns();
        assert!(b >= a);
    }
}
