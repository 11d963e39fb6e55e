/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod primary;
pub use primary::{as_f64, as_u8, as_usize};

mod histogram;
pub use histogram::{as_histogram_config, as_percentile, as_percentile_list};
