/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use crate::config::{ConfigError, HistogramConfig};

pub(crate) const MAX_BUCKET_COUNT: usize = 32768;

/// Ordered bucket upper bounds, derived once per config and shared
/// read-only by every phase of the window.
pub struct BucketLayout {
    bounds: Box<[f64]>,
}

impl BucketLayout {
    pub(crate) fn new(config: &HistogramConfig) -> Result<Self, ConfigError> {
        let slo = config.service_level_objectives();
        if slo.is_empty() {
            BucketLayout::generate(
                config.minimum_expected_value(),
                config.maximum_expected_value(),
                config.precision(),
            )
        } else {
            Ok(BucketLayout::from_slo(
                slo,
                config.maximum_expected_value(),
            ))
        }
    }

    /// Caller supplied bounds are used verbatim after sort and dedup,
    /// with a catch-all bound appended when they stop short of the
    /// expected value range.
    fn from_slo(slo: &[f64], max_expected: f64) -> Self {
        let mut bounds: Vec<f64> = slo.to_vec();
        bounds.sort_by(f64::total_cmp);
        bounds.dedup();
        if let Some(last) = bounds.last()
            && last.is_finite()
            && *last < max_expected
        {
            bounds.push(f64::INFINITY);
        }
        BucketLayout {
            bounds: bounds.into_boxed_slice(),
        }
    }

    /// Geometric bounds from `min` up past `max` with ratio
    /// `1 + 10^-precision`, so snapping a value to its bucket bound
    /// introduces a relative error of at most `10^-precision`.
    fn generate(min: f64, max: f64, precision: u8) -> Result<Self, ConfigError> {
        let ratio = 1.0 + 10f64.powi(-i32::from(precision));
        let needed = ((max / min).ln() / ratio.ln()).ceil() as usize + 1;
        if needed > MAX_BUCKET_COUNT {
            return Err(ConfigError::TooManyBuckets {
                needed,
                limit: MAX_BUCKET_COUNT,
            });
        }

        let mut bounds = Vec::with_capacity(needed);
        let mut bound = min;
        bounds.push(bound);
        while bound < max {
            bound *= ratio;
            bounds.push(bound);
        }
        Ok(BucketLayout {
            bounds: bounds.into_boxed_slice(),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    #[inline]
    pub fn bound(&self, index: usize) -> f64 {
        self.bounds[index]
    }

    /// Index of the smallest bound that is >= value. Values above the
    /// last bound land in the last (catch-all) bucket.
    pub fn bucket_index(&self, value: f64) -> usize {
        let i = self.bounds.partition_point(|b| *b < value);
        i.min(self.bounds.len() - 1)
    }
}
