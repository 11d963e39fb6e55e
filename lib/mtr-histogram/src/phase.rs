/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::atomic::{AtomicU64, Ordering};

use portable_atomic::AtomicF64;

/// One time slice of bucket counters inside the rolling window.
///
/// Writers touch independent atomic cells and never block each other.
/// The generation stamp goes odd while a reset is in progress so readers
/// can detect a torn read and retry.
pub(crate) struct Phase {
    counts: Box<[AtomicU64]>,
    sum: AtomicF64,
    max: AtomicF64,
    generation: AtomicU64,
}

pub(crate) struct PhaseReadout {
    pub(crate) counts: Vec<u64>,
    pub(crate) sum: f64,
    pub(crate) max: f64,
}

impl PhaseReadout {
    pub(crate) fn new(bucket_count: usize) -> Self {
        PhaseReadout {
            counts: Vec::with_capacity(bucket_count),
            sum: 0.0,
            max: 0.0,
        }
    }
}

impl Phase {
    pub(crate) fn new(bucket_count: usize) -> Self {
        let counts = (0..bucket_count).map(|_| AtomicU64::new(0)).collect();
        Phase {
            counts,
            sum: AtomicF64::new(0.0),
            max: AtomicF64::new(0.0),
            generation: AtomicU64::new(0),
        }
    }

    pub(crate) fn observe(&self, bucket_index: usize, value: f64) {
        self.counts[bucket_index].fetch_add(1, Ordering::Relaxed);
        self.sum.fetch_add(value, Ordering::Relaxed);
        let _ = self
            .max
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cur| {
                (value > cur).then_some(value)
            });
    }

    /// Clear all counters. Only the single rotation winner may call this.
    pub(crate) fn reset(&self) {
        self.generation.fetch_add(1, Ordering::Release);
        for c in self.counts.iter() {
            c.store(0, Ordering::Relaxed);
        }
        self.sum.store(0.0, Ordering::Relaxed);
        self.max.store(0.0, Ordering::Relaxed);
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// Seqlock style stable read. Returns false when a concurrent reset
    /// raced the read and the caller should retry.
    pub(crate) fn read(&self, out: &mut PhaseReadout) -> bool {
        let before = self.generation.load(Ordering::Acquire);
        if before & 1 == 1 {
            return false;
        }
        out.counts.clear();
        out.counts
            .extend(self.counts.iter().map(|c| c.load(Ordering::Relaxed)));
        out.sum = self.sum.load(Ordering::Relaxed);
        out.max = self.max.load(Ordering::Relaxed);
        self.generation.load(Ordering::Acquire) == before
    }
}
