/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use crate::ClockSource;
use crate::rotating::WindowCore;

/// Write-only handle to a [`RotatingHistogram`](crate::RotatingHistogram).
///
/// Safe to clone into any number of threads; each record call touches
/// only atomic counters on the current phase.
pub struct HistogramRecorder<C: ClockSource> {
    core: Arc<WindowCore<C>>,
}

impl<C: ClockSource> Clone for HistogramRecorder<C> {
    fn clone(&self) -> Self {
        HistogramRecorder {
            core: Arc::clone(&self.core),
        }
    }
}

impl<C: ClockSource> HistogramRecorder<C> {
    pub(crate) fn new(core: Arc<WindowCore<C>>) -> Self {
        HistogramRecorder { core }
    }

    pub fn record(&self, value: f64) {
        self.core.record(value)
    }
}
