/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::time::Duration;

/// A percentile estimate taken from a snapshot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ValueAtPercentile {
    percentile: f64,
    value: f64,
}

impl ValueAtPercentile {
    pub(crate) fn new(percentile: f64, value: f64) -> Self {
        ValueAtPercentile { percentile, value }
    }

    #[inline]
    pub fn percentile(&self) -> f64 {
        self.percentile
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Cumulative observation count at a bucket bound: how many recorded
/// values were less than or equal to `bucket`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CountAtBucket {
    bucket: f64,
    count: u64,
}

impl CountAtBucket {
    pub(crate) fn new(bucket: f64, count: u64) -> Self {
        CountAtBucket { bucket, count }
    }

    #[inline]
    pub fn bucket(&self) -> f64 {
        self.bucket
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }
}

/// Point-in-time merged view over all live phases of the window.
///
/// A plain value with no ties back to the histogram; exporters can hold
/// it for as long as they need.
pub struct HistogramSnapshot {
    count: u64,
    total: f64,
    max: f64,
    percentile_values: Vec<ValueAtPercentile>,
    bucket_counts: Vec<CountAtBucket>,
    taken_at: Duration,
}

impl HistogramSnapshot {
    pub(crate) fn new(
        count: u64,
        total: f64,
        max: f64,
        percentile_values: Vec<ValueAtPercentile>,
        bucket_counts: Vec<CountAtBucket>,
        taken_at: Duration,
    ) -> Self {
        HistogramSnapshot {
            count,
            total,
            max,
            percentile_values,
            bucket_counts,
            taken_at,
        }
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Sum of all recorded values in the window.
    #[inline]
    pub fn total(&self) -> f64 {
        self.total
    }

    #[inline]
    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }

    #[inline]
    pub fn percentile_values(&self) -> &[ValueAtPercentile] {
        &self.percentile_values
    }

    #[inline]
    pub fn bucket_counts(&self) -> &[CountAtBucket] {
        &self.bucket_counts
    }

    /// Clock reading at the time the snapshot was merged.
    #[inline]
    pub fn taken_at(&self) -> Duration {
        self.taken_at
    }
}
