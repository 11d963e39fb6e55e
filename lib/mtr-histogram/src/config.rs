/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::runtime::Handle;

use crate::layout::MAX_BUCKET_COUNT;
use crate::{ClockSource, HistogramRecorder, HistogramStats, Percentile, RotatingHistogram};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("minimum expected value {min} should be > 0 and < maximum expected value {max}")]
    InvalidValueRange { min: f64, max: f64 },
    #[error("precision {0} should be in range 1-5 significant digits")]
    InvalidPrecision(u8),
    #[error("service level objective {0} should be a positive number")]
    InvalidServiceLevelObjective(f64),
    #[error("a rolling window requires a positive expiry and buffer length")]
    InvalidWindow,
    #[error("bucket layout would need {needed} buckets, more than the allowed {limit}")]
    TooManyBuckets { needed: usize, limit: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct WindowConfig {
    expiry: Duration,
    buffer_length: usize,
}

/// Everything a histogram meter can be configured with.
///
/// Without a rolling window the histogram is cumulative and never expires
/// recorded values. With a window of `expiry` split into `buffer_length`
/// phases, values older than `expiry` rotate out.
#[derive(Clone, Debug, PartialEq)]
pub struct HistogramConfig {
    minimum_expected_value: f64,
    maximum_expected_value: f64,
    precision: u8,
    service_level_objectives: Vec<f64>,
    percentiles: BTreeSet<Percentile>,
    window: Option<WindowConfig>,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        HistogramConfig {
            minimum_expected_value: 1.0,
            maximum_expected_value: 1_000_000.0,
            precision: 2,
            service_level_objectives: Vec::new(),
            percentiles: BTreeSet::new(),
            window: None,
        }
    }
}

impl HistogramConfig {
    pub const DEFAULT_BUFFER_LENGTH: usize = 3;

    pub fn with_window(expiry: Duration, buffer_length: usize) -> Self {
        let mut config = HistogramConfig::default();
        config.set_window(expiry, buffer_length);
        config
    }

    #[inline]
    pub fn set_minimum_expected_value(&mut self, min: f64) {
        self.minimum_expected_value = min;
    }

    #[inline]
    pub fn set_maximum_expected_value(&mut self, max: f64) {
        self.maximum_expected_value = max;
    }

    #[inline]
    pub fn set_precision(&mut self, digits: u8) {
        self.precision = digits;
    }

    #[inline]
    pub fn set_service_level_objectives(&mut self, bounds: Vec<f64>) {
        self.service_level_objectives = bounds;
    }

    #[inline]
    pub fn set_percentile_list(&mut self, list: BTreeSet<Percentile>) {
        self.percentiles = list;
    }

    #[inline]
    pub fn set_window(&mut self, expiry: Duration, buffer_length: usize) {
        self.window = Some(WindowConfig {
            expiry,
            buffer_length,
        });
    }

    #[inline]
    pub fn minimum_expected_value(&self) -> f64 {
        self.minimum_expected_value
    }

    #[inline]
    pub fn maximum_expected_value(&self) -> f64 {
        self.maximum_expected_value
    }

    #[inline]
    pub fn precision(&self) -> u8 {
        self.precision
    }

    #[inline]
    pub fn service_level_objectives(&self) -> &[f64] {
        &self.service_level_objectives
    }

    #[inline]
    pub fn percentiles(&self) -> &BTreeSet<Percentile> {
        &self.percentiles
    }

    #[inline]
    pub fn expiry(&self) -> Option<Duration> {
        self.window.map(|w| w.expiry)
    }

    /// Number of phases in the rolling window, 1 for a cumulative histogram.
    pub fn buffer_length(&self) -> usize {
        self.window.map(|w| w.buffer_length).unwrap_or(1)
    }

    /// Time covered by a single phase, `None` for a cumulative histogram.
    pub fn rotate_interval(&self) -> Option<Duration> {
        self.window.map(|w| w.expiry / w.buffer_length.max(1) as u32)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if !(self.minimum_expected_value > 0.0)
            || !(self.maximum_expected_value > self.minimum_expected_value)
        {
            return Err(ConfigError::InvalidValueRange {
                min: self.minimum_expected_value,
                max: self.maximum_expected_value,
            });
        }
        if !(1..=5).contains(&self.precision) {
            return Err(ConfigError::InvalidPrecision(self.precision));
        }
        for slo in &self.service_level_objectives {
            if !(*slo > 0.0) {
                return Err(ConfigError::InvalidServiceLevelObjective(*slo));
            }
        }
        if self.service_level_objectives.len() > MAX_BUCKET_COUNT {
            return Err(ConfigError::TooManyBuckets {
                needed: self.service_level_objectives.len(),
                limit: MAX_BUCKET_COUNT,
            });
        }
        if let Some(window) = &self.window {
            if window.buffer_length < 1 || window.expiry.is_zero() {
                return Err(ConfigError::InvalidWindow);
            }
        }
        Ok(())
    }

    pub fn build<C: ClockSource>(&self, clock: C) -> Result<RotatingHistogram<C>, ConfigError> {
        RotatingHistogram::new(self, clock)
    }

    /// Build the histogram and a background task that keeps an exporter
    /// facing [`HistogramStats`] refreshed with the latest snapshot.
    pub fn build_spawned<C: ClockSource>(
        &self,
        clock: C,
        handle: Option<Handle>,
    ) -> Result<(HistogramRecorder<C>, Arc<HistogramStats>), ConfigError> {
        const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(4);

        let histogram = self.build(clock)?;
        let stats = if self.percentiles.is_empty() {
            Arc::new(HistogramStats::default())
        } else {
            Arc::new(HistogramStats::with_percentiles(&self.percentiles))
        };
        let interval = self
            .rotate_interval()
            .unwrap_or(DEFAULT_REFRESH_INTERVAL);
        histogram.spawn_refresh(Arc::clone(&stats), interval, handle);
        Ok((histogram.recorder(), stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualClock;
    use std::str::FromStr;

    #[test]
    fn default_is_cumulative() {
        let config = HistogramConfig::default();
        assert!(config.rotate_interval().is_none());
        assert_eq!(config.buffer_length(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn window_interval() {
        let config = HistogramConfig::with_window(Duration::from_secs(60), 3);
        assert_eq!(config.rotate_interval(), Some(Duration::from_secs(20)));
        assert_eq!(config.buffer_length(), 3);
    }

    #[test]
    fn reject_bad_value_range() {
        let mut config = HistogramConfig::default();
        config.set_minimum_expected_value(100.0);
        config.set_maximum_expected_value(10.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValueRange { .. })
        ));

        config.set_minimum_expected_value(0.0);
        config.set_maximum_expected_value(10.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValueRange { .. })
        ));

        config.set_minimum_expected_value(f64::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_bad_precision() {
        let mut config = HistogramConfig::default();
        config.set_precision(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPrecision(0))
        ));
        config.set_precision(6);
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_bad_window() {
        let config = HistogramConfig::with_window(Duration::ZERO, 3);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidWindow)));
        let config = HistogramConfig::with_window(Duration::from_secs(60), 0);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidWindow)));
    }

    #[test]
    fn reject_bad_slo() {
        let mut config = HistogramConfig::default();
        config.set_service_level_objectives(vec![10.0, -1.0]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidServiceLevelObjective(_))
        ));
    }

    #[test]
    fn build_checks_config() {
        let mut config = HistogramConfig::default();
        config.set_precision(9);
        assert!(config.build(ManualClock::new()).is_err());

        let mut config = HistogramConfig::default();
        config
            .set_percentile_list([Percentile::from_str("0.5").unwrap()].into_iter().collect());
        assert!(config.build(ManualClock::new()).is_ok());
    }
}
