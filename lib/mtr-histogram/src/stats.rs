/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use portable_atomic::AtomicF64;

use crate::{HistogramSnapshot, Percentile};

struct HistogramPercentileStats {
    percentile: Percentile,
    value: AtomicF64,
}

impl HistogramPercentileStats {
    fn new(percentile: Percentile) -> Self {
        HistogramPercentileStats {
            percentile,
            value: AtomicF64::new(0.0),
        }
    }
}

/// Exporter-facing publication block, refreshed from snapshots by the
/// task spawned in [`spawn_refresh`](crate::RotatingHistogram::spawn_refresh)
/// and read lock-free by the emit side.
pub struct HistogramStats {
    count: AtomicU64,
    total: AtomicF64,
    max: AtomicF64,
    mean: AtomicF64,
    percentile: Vec<HistogramPercentileStats>,
}

impl HistogramStats {
    pub fn new() -> Self {
        HistogramStats {
            count: AtomicU64::new(0),
            total: AtomicF64::new(0.0),
            max: AtomicF64::new(0.0),
            mean: AtomicF64::new(0.0),
            percentile: Vec::with_capacity(8),
        }
    }

    pub fn with_percentiles<'a, T>(percentiles: T) -> Self
    where
        T: IntoIterator<Item = &'a Percentile>,
    {
        let mut stats = HistogramStats::new();
        for p in percentiles {
            stats
                .percentile
                .push(HistogramPercentileStats::new(p.clone()));
        }
        stats
    }

    pub fn with_percentile(mut self, percentile: Percentile) -> Self {
        self.percentile
            .push(HistogramPercentileStats::new(percentile));
        self
    }

    pub(crate) fn percentile_list(&self) -> Vec<Percentile> {
        self.percentile.iter().map(|p| p.percentile.clone()).collect()
    }

    /// The snapshot's percentile values are matched positionally, so it
    /// must have been taken with this block's percentile list.
    pub fn update(&self, snapshot: &HistogramSnapshot) {
        self.count.store(snapshot.count(), Ordering::Relaxed);
        self.total.store(snapshot.total(), Ordering::Relaxed);
        self.max.store(snapshot.max(), Ordering::Relaxed);
        self.mean.store(snapshot.mean(), Ordering::Relaxed);
        for (cell, v) in self.percentile.iter().zip(snapshot.percentile_values()) {
            cell.value.store(v.value(), Ordering::Relaxed);
        }
    }

    pub fn foreach_stat<F>(&self, mut call: F)
    where
        F: FnMut(Option<f64>, &str, f64),
    {
        let count = self.count.load(Ordering::Relaxed);
        call(None, "count", count as f64);
        let total = self.total.load(Ordering::Relaxed);
        call(None, "total", total);
        let max = self.max.load(Ordering::Relaxed);
        call(None, "max", max);
        let mean = self.mean.load(Ordering::Relaxed);
        call(None, "mean", mean);
        for p in &self.percentile {
            let v = p.value.load(Ordering::Relaxed);
            call(Some(p.percentile.value()), p.percentile.as_str(), v);
        }
    }
}

impl Default for HistogramStats {
    fn default() -> Self {
        HistogramStats::new()
            .with_percentile(Percentile::from_str("0.50").unwrap())
            .with_percentile(Percentile::from_str("0.80").unwrap())
            .with_percentile(Percentile::from_str("0.90").unwrap())
            .with_percentile(Percentile::from_str("0.95").unwrap())
            .with_percentile(Percentile::from_str("0.99").unwrap())
    }
}
