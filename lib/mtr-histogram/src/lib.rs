/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod clock;
pub use clock::{ClockSource, ManualClock, MonotonicClock};

mod percentile;
pub use percentile::{Percentile, PercentileError};

mod config;
pub use config::{ConfigError, HistogramConfig};

mod layout;
pub use layout::BucketLayout;

mod phase;

mod recorder;
pub use recorder::HistogramRecorder;

mod rotating;
pub use rotating::RotatingHistogram;

mod snapshot;
pub use snapshot::{CountAtBucket, HistogramSnapshot, ValueAtPercentile};

mod stats;
pub use stats::HistogramStats;
