/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic time source used to drive window rotation.
///
/// Rotation is decoupled from the wall clock so tests can advance time
/// explicitly instead of sleeping.
pub trait ClockSource: Send + Sync + 'static {
    /// Elapsed monotonic time since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

impl<C: ClockSource> ClockSource for Arc<C> {
    fn now(&self) -> Duration {
        self.as_ref().now()
    }
}

/// The production clock, anchored at its creation instant.
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        MonotonicClock::new()
    }
}

impl ClockSource for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A clock that only moves when told to, for deterministic rotation tests.
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        ManualClock {
            nanos: AtomicU64::new(0),
        }
    }

    pub fn advance(&self, dur: Duration) {
        self.nanos.fetch_add(dur.as_nanos() as u64, Ordering::Relaxed);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        ManualClock::new()
    }
}

impl ClockSource for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Relaxed))
    }
}
