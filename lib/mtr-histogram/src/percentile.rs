/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::cmp::Ordering;
use std::str::FromStr;

use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PercentileError {
    #[error("invalid decimal string: {0}")]
    InvalidDecimal(rust_decimal::Error),
    #[error("percentile should be in range (0, 1]")]
    OutOfRange,
}

/// A percentile rank requested from a histogram, such as `0.95`.
///
/// The normalized string form is kept so exporters can use it directly
/// as a metric tag value.
#[derive(Clone, Debug)]
pub struct Percentile {
    value: Decimal,
    display: String,
}

impl Percentile {
    pub fn new(value: Decimal) -> Result<Self, PercentileError> {
        if value <= Decimal::ZERO || value > Decimal::ONE {
            return Err(PercentileError::OutOfRange);
        }
        let value = value.normalize();
        let display = value.to_string();
        Ok(Percentile { value, display })
    }

    pub fn value(&self) -> f64 {
        self.value.to_f64().unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.display
    }
}

impl FromStr for Percentile {
    type Err = PercentileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let d = Decimal::from_str(s.trim()).map_err(PercentileError::InvalidDecimal)?;
        Percentile::new(d)
    }
}

impl PartialEq for Percentile {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Percentile {}

impl PartialOrd for Percentile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Percentile {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}
