/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use log::debug;
use tokio::runtime::Handle;

use crate::phase::{Phase, PhaseReadout};
use crate::snapshot::{CountAtBucket, HistogramSnapshot, ValueAtPercentile};
use crate::{
    BucketLayout, ClockSource, ConfigError, HistogramConfig, HistogramRecorder, HistogramStats,
    Percentile,
};

pub(crate) struct WindowCore<C: ClockSource> {
    layout: BucketLayout,
    phases: Box<[Phase]>,
    current: AtomicUsize,
    last_rotation: AtomicU64,
    rotating: AtomicBool,
    // nanos covered by one phase, 0 for a cumulative histogram
    rotate_interval: u64,
    percentiles: Vec<Percentile>,
    clock: C,
}

/// A bucketed histogram over a rolling time window.
///
/// Cheap to clone, all clones share the same window. Writes go through
/// [`record`](Self::record) or a [`HistogramRecorder`] handle and never
/// block; reads produce an immutable [`HistogramSnapshot`].
pub struct RotatingHistogram<C: ClockSource> {
    core: Arc<WindowCore<C>>,
}

impl<C: ClockSource> Clone for RotatingHistogram<C> {
    fn clone(&self) -> Self {
        RotatingHistogram {
            core: Arc::clone(&self.core),
        }
    }
}

impl<C: ClockSource> RotatingHistogram<C> {
    pub fn new(config: &HistogramConfig, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;
        let layout = BucketLayout::new(config)?;
        let buffer_length = config.buffer_length();
        let rotate_interval = config
            .rotate_interval()
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        let phases = (0..buffer_length)
            .map(|_| Phase::new(layout.len()))
            .collect();
        let now = clock.now().as_nanos() as u64;
        Ok(RotatingHistogram {
            core: Arc::new(WindowCore {
                layout,
                phases,
                current: AtomicUsize::new(0),
                last_rotation: AtomicU64::new(now),
                rotating: AtomicBool::new(false),
                rotate_interval,
                percentiles: config.percentiles().iter().cloned().collect(),
                clock,
            }),
        })
    }

    /// A write-only handle that can be handed to instrumented code.
    pub fn recorder(&self) -> HistogramRecorder<C> {
        HistogramRecorder::new(Arc::clone(&self.core))
    }

    pub fn record(&self, value: f64) {
        self.core.record(value)
    }

    /// Snapshot with the percentiles from the config.
    pub fn snapshot(&self) -> HistogramSnapshot {
        self.core.snapshot(None)
    }

    /// Snapshot with an explicit percentile list, for exporters that
    /// need more than the configured set.
    pub fn snapshot_with(&self, percentiles: &[Percentile]) -> HistogramSnapshot {
        self.core.snapshot(Some(percentiles))
    }

    /// Keep `stats` refreshed with a fresh snapshot every `interval`.
    ///
    /// The task holds only a weak reference and exits once every
    /// histogram and recorder handle has been dropped.
    pub fn spawn_refresh(
        &self,
        stats: Arc<HistogramStats>,
        interval: Duration,
        handle: Option<Handle>,
    ) {
        let core = Arc::downgrade(&self.core);
        let handle = handle.unwrap_or_else(Handle::current);
        handle.spawn(async move {
            let mut interval = tokio::time::interval(interval);
            loop {
                interval.tick().await;
                let Some(core) = Weak::upgrade(&core) else {
                    debug!("histogram dropped, stopping stats refresh");
                    break;
                };
                let percentiles = stats.percentile_list();
                stats.update(&core.snapshot(Some(&percentiles)));
            }
        });
    }
}

impl<C: ClockSource> WindowCore<C> {
    /// Never fails: NaN is discarded without being counted, negative
    /// values are clamped to zero and counted in the first bucket.
    pub(crate) fn record(&self, value: f64) {
        if value.is_nan() {
            return;
        }
        let value = if value < 0.0 { 0.0 } else { value };
        self.rotate_if_due(self.clock.now());
        let index = self.layout.bucket_index(value);
        let phase = &self.phases[self.current.load(Ordering::Acquire)];
        phase.observe(index, value);
    }

    fn rotate_if_due(&self, now: Duration) {
        if self.rotate_interval == 0 {
            return;
        }
        let now = now.as_nanos() as u64;
        let last = self.last_rotation.load(Ordering::Acquire);
        if now.saturating_sub(last) < self.rotate_interval {
            return;
        }
        if self.rotating.swap(true, Ordering::Acquire) {
            // another caller won the gate, let it do the work
            return;
        }
        let last = self.last_rotation.load(Ordering::Acquire);
        let due = (now.saturating_sub(last) / self.rotate_interval) as usize;
        if due > 0 {
            if due > 1 {
                debug!("catching up {due} elapsed rotation intervals");
            }
            let steps = due.min(self.phases.len());
            let mut current = self.current.load(Ordering::Acquire);
            for _ in 0..steps {
                current = (current + 1) % self.phases.len();
                self.phases[current].reset();
                self.current.store(current, Ordering::Release);
            }
            self.last_rotation
                .store(last + due as u64 * self.rotate_interval, Ordering::Release);
        }
        self.rotating.store(false, Ordering::Release);
    }

    pub(crate) fn snapshot(&self, percentiles: Option<&[Percentile]>) -> HistogramSnapshot {
        let now = self.clock.now();
        self.rotate_if_due(now);

        let bucket_count = self.layout.len();
        let mut counts = vec![0u64; bucket_count];
        let mut total = 0.0f64;
        let mut max = 0.0f64;
        let mut readout = PhaseReadout::new(bucket_count);
        for phase in self.phases.iter() {
            // a reset is short, but the resetting thread may get descheduled
            let mut spins = 0;
            while !phase.read(&mut readout) {
                spins += 1;
                if spins < 64 {
                    std::hint::spin_loop();
                } else {
                    std::thread::yield_now();
                }
            }
            for (acc, c) in counts.iter_mut().zip(readout.counts.iter()) {
                *acc += *c;
            }
            total += readout.sum;
            if readout.max > max {
                max = readout.max;
            }
        }

        let mut cumulative = 0u64;
        let mut bucket_counts = Vec::with_capacity(bucket_count);
        for (i, c) in counts.iter().enumerate() {
            cumulative += *c;
            bucket_counts.push(CountAtBucket::new(self.layout.bound(i), cumulative));
        }
        let count = cumulative;

        let requested = percentiles.unwrap_or(&self.percentiles);
        let mut percentile_values = Vec::with_capacity(requested.len());
        for p in requested {
            let v = value_at_percentile(p.value(), count, &bucket_counts);
            percentile_values.push(ValueAtPercentile::new(p.value(), v));
        }

        HistogramSnapshot::new(count, total, max, percentile_values, bucket_counts, now)
    }
}

/// Boundary-snapped estimate: the bound of the first bucket whose
/// cumulative count reaches the target rank. No interpolation inside
/// the bucket, the error is bounded by the bucket width.
fn value_at_percentile(percentile: f64, count: u64, cumulative: &[CountAtBucket]) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let rank = (percentile * count as f64).ceil() as u64;
    for c in cumulative {
        if c.count() >= rank {
            return c.bucket();
        }
    }
    cumulative.last().map(|c| c.bucket()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualClock;
    use std::str::FromStr;

    fn percentile(s: &str) -> Percentile {
        Percentile::from_str(s).unwrap()
    }

    fn latency_config() -> HistogramConfig {
        let mut config = HistogramConfig::with_window(Duration::from_secs(60), 3);
        config.set_minimum_expected_value(1.0);
        config.set_maximum_expected_value(1000.0);
        config.set_precision(2);
        config.set_percentile_list(
            [percentile("0.5"), percentile("0.95")].into_iter().collect(),
        );
        config
    }

    #[test]
    fn latency_scenario() {
        let clock = Arc::new(ManualClock::new());
        let h = latency_config().build(Arc::clone(&clock)).unwrap();
        for v in [
            10.0, 10.0, 10.0, 20.0, 20.0, 50.0, 100.0, 500.0, 900.0, 1000.0,
        ] {
            h.record(v);
        }

        let snap = h.snapshot();
        assert_eq!(snap.count(), 10);
        assert_eq!(snap.max(), 1000.0);
        assert!((snap.total() - 2620.0).abs() < 1e-6);

        let values = snap.percentile_values();
        assert_eq!(values.len(), 2);
        let p50 = values[0].value();
        let p95 = values[1].value();
        // rank 5 lands in the bucket holding 20, rank 10 in the one holding 1000
        assert!((20.0..20.5).contains(&p50), "p50 = {p50}");
        assert!((1000.0..1011.0).contains(&p95), "p95 = {p95}");
        assert!(p50 <= p95);
    }

    #[test]
    fn percentile_monotonicity() {
        let clock = Arc::new(ManualClock::new());
        let h = latency_config().build(Arc::clone(&clock)).unwrap();
        for v in 1..=100 {
            h.record(v as f64 * 7.0 % 900.0);
        }
        let list = [
            percentile("0.1"),
            percentile("0.5"),
            percentile("0.9"),
            percentile("0.99"),
            percentile("1"),
        ];
        let snap = h.snapshot_with(&list);
        let values = snap.percentile_values();
        for pair in values.windows(2) {
            assert!(pair[0].value() <= pair[1].value());
        }
    }

    #[test]
    fn cumulative_bucket_counts() {
        let clock = Arc::new(ManualClock::new());
        let mut config = HistogramConfig::with_window(Duration::from_secs(60), 3);
        config.set_maximum_expected_value(1000.0);
        config.set_service_level_objectives(vec![10.0, 100.0, 1000.0]);
        let h = config.build(Arc::clone(&clock)).unwrap();
        for v in [5.0, 50.0, 500.0, 800.0] {
            h.record(v);
        }
        let snap = h.snapshot();
        let buckets = snap.bucket_counts();
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0].count(), 1);
        assert_eq!(buckets[1].count(), 2);
        assert_eq!(buckets[2].count(), 4);
        assert_eq!(snap.count(), 4);
    }

    #[test]
    fn slo_catch_all_bucket_counts() {
        let clock = Arc::new(ManualClock::new());
        // slo bounds stop short of the expected value range, so a +inf
        // catch-all bucket is appended after them
        let mut config = HistogramConfig::with_window(Duration::from_secs(60), 3);
        config.set_service_level_objectives(vec![10.0, 100.0, 1000.0]);
        let h = config.build(Arc::clone(&clock)).unwrap();
        for v in [5.0, 50.0, 500.0, 800.0] {
            h.record(v);
        }
        let snap = h.snapshot();
        let buckets = snap.bucket_counts();
        assert_eq!(buckets.len(), 4);
        assert_eq!(buckets[3].bucket(), f64::INFINITY);
        assert_eq!(buckets[0].count(), 1);
        assert_eq!(buckets[1].count(), 2);
        assert_eq!(buckets[2].count(), 4);
        assert_eq!(buckets[3].count(), 4);
        assert_eq!(snap.count(), 4);

        h.record(5000.0);
        let snap = h.snapshot();
        assert_eq!(snap.bucket_counts()[2].count(), 4);
        assert_eq!(snap.bucket_counts()[3].count(), 5);
    }

    #[test]
    fn single_value_decays() {
        let clock = Arc::new(ManualClock::new());
        let h = latency_config().build(Arc::clone(&clock)).unwrap();
        h.record(5.0);
        assert_eq!(h.snapshot().count(), 1);

        // three rotation intervals of 20s push the value out of the window
        clock.advance(Duration::from_secs(60));
        let snap = h.snapshot();
        assert_eq!(snap.count(), 0);
        assert_eq!(snap.max(), 0.0);
        for v in snap.percentile_values() {
            assert_eq!(v.value(), 0.0);
        }
    }

    #[test]
    fn values_survive_partial_rotation() {
        let clock = Arc::new(ManualClock::new());
        let h = latency_config().build(Arc::clone(&clock)).unwrap();
        h.record(10.0);
        clock.advance(Duration::from_secs(20));
        h.record(20.0);
        clock.advance(Duration::from_secs(20));
        h.record(30.0);

        let snap = h.snapshot();
        assert_eq!(snap.count(), 3);
        assert_eq!(snap.max(), 30.0);

        // one more interval expires the first value only
        clock.advance(Duration::from_secs(20));
        let snap = h.snapshot();
        assert_eq!(snap.count(), 2);
        assert_eq!(snap.max(), 30.0);
    }

    #[test]
    fn idle_catch_up_clears_all_phases() {
        let clock = Arc::new(ManualClock::new());
        let h = latency_config().build(Arc::clone(&clock)).unwrap();
        h.record(5.0);
        // idle for many windows, then rotation catches up in one call
        clock.advance(Duration::from_secs(600));
        assert_eq!(h.snapshot().count(), 0);

        h.record(7.0);
        assert_eq!(h.snapshot().count(), 1);
    }

    #[test]
    fn snapshot_idempotent_without_writes() {
        let clock = Arc::new(ManualClock::new());
        let h = latency_config().build(Arc::clone(&clock)).unwrap();
        for v in [10.0, 20.0, 30.0] {
            h.record(v);
        }
        let a = h.snapshot();
        let b = h.snapshot();
        assert_eq!(a.count(), b.count());
        assert_eq!(a.total(), b.total());
        assert_eq!(a.max(), b.max());
        assert_eq!(a.percentile_values(), b.percentile_values());
        assert_eq!(a.bucket_counts(), b.bucket_counts());
    }

    #[test]
    fn empty_snapshot_is_all_zero() {
        let clock = Arc::new(ManualClock::new());
        let h = latency_config().build(Arc::clone(&clock)).unwrap();
        let snap = h.snapshot();
        assert_eq!(snap.count(), 0);
        assert_eq!(snap.total(), 0.0);
        assert_eq!(snap.max(), 0.0);
        assert_eq!(snap.mean(), 0.0);
        for v in snap.percentile_values() {
            assert_eq!(v.value(), 0.0);
        }
        for b in snap.bucket_counts() {
            assert_eq!(b.count(), 0);
        }
    }

    #[test]
    fn nan_discarded_negative_clamped() {
        let clock = Arc::new(ManualClock::new());
        let h = latency_config().build(Arc::clone(&clock)).unwrap();
        h.record(f64::NAN);
        assert_eq!(h.snapshot().count(), 0);

        h.record(-5.0);
        let snap = h.snapshot();
        assert_eq!(snap.count(), 1);
        assert_eq!(snap.max(), 0.0);
        assert_eq!(snap.bucket_counts()[0].count(), 1);
    }

    #[test]
    fn cumulative_mode_never_expires() {
        let clock = Arc::new(ManualClock::new());
        let mut config = HistogramConfig::default();
        config.set_maximum_expected_value(1000.0);
        let h = config.build(Arc::clone(&clock)).unwrap();
        h.record(10.0);
        clock.advance(Duration::from_secs(86400));
        h.record(20.0);
        assert_eq!(h.snapshot().count(), 2);
    }

    #[test]
    fn snapshot_completes_alongside_rotation() {
        let clock = Arc::new(ManualClock::new());
        let h = latency_config().build(Arc::clone(&clock)).unwrap();

        let writer = {
            let h = h.clone();
            let clock = Arc::clone(&clock);
            std::thread::spawn(move || {
                // every record call triggers a due rotation
                for _ in 0..1000 {
                    clock.advance(Duration::from_secs(20));
                    h.record(42.0);
                }
            })
        };
        let reader = {
            let h = h.clone();
            std::thread::spawn(move || {
                for _ in 0..1000 {
                    let snap = h.snapshot();
                    assert!(snap.count() <= 3);
                }
            })
        };
        writer.join().unwrap();
        reader.join().unwrap();
    }

    #[test]
    fn concurrent_writers_lose_nothing() {
        let clock = Arc::new(ManualClock::new());
        let h = latency_config().build(Arc::clone(&clock)).unwrap();

        let mut writers = Vec::new();
        for _ in 0..8 {
            let recorder = h.recorder();
            writers.push(std::thread::spawn(move || {
                for _ in 0..10_000 {
                    recorder.record(42.0);
                }
            }));
        }
        let reader = {
            let h = h.clone();
            std::thread::spawn(move || {
                for _ in 0..100 {
                    let snap = h.snapshot();
                    assert!(snap.count() <= 80_000);
                }
            })
        };
        for w in writers {
            w.join().unwrap();
        }
        reader.join().unwrap();

        assert_eq!(h.snapshot().count(), 80_000);
    }
}
