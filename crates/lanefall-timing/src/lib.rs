//! Monotonic millisecond clocks.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

/// Abstraction over time sources.
/// Implementations: SystemClock (production), ManualClock (testing).
pub trait Clock {
    /// Current time in milliseconds from an arbitrary epoch.
    /// Never decreases between calls.
    fn now_ms(&self) -> i64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> i64 {
        (**self).now_ms()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_ms(&self) -> i64 {
        (**self).now_ms()
    }
}

/// Wall clock backed by `std::time::Instant`, zeroed at construction.
#[derive(Debug, Clone)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        self.start.elapsed().as_millis() as i64
    }
}

/// Hand-driven clock for deterministic tests and simulations.
///
/// Shareable across threads; `set` refuses to move time backwards so the
/// monotonic contract of [`Clock`] holds.
#[derive(Debug, Default)]
pub struct ManualClock {
    current_ms: AtomicI64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(ms: i64) -> Self {
        Self {
            current_ms: AtomicI64::new(ms),
        }
    }

    /// Jump to `ms`. Earlier values are ignored.
    pub fn set(&self, ms: i64) {
        let previous = self.current_ms.fetch_max(ms, Ordering::AcqRel);
        if ms < previous {
            log::warn!("ManualClock::set({ms}) ignored, clock already at {previous}");
        }
    }

    /// Move forward by `delta_ms` (negative deltas are ignored).
    pub fn advance(&self, delta_ms: i64) {
        if delta_ms > 0 {
            self.current_ms.fetch_add(delta_ms, Ordering::AcqRel);
        }
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.current_ms.load(Ordering::Acquire)
    }
}
