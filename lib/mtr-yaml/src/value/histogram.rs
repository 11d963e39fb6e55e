/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use yaml_rust::Yaml;

use mtr_histogram::{HistogramConfig, Percentile};

pub fn as_percentile(value: &Yaml) -> anyhow::Result<Percentile> {
    match value {
        Yaml::String(s) => {
            Percentile::from_str(s).map_err(|e| anyhow!("invalid percentile value: {e}"))
        }
        Yaml::Real(s) => {
            Percentile::from_str(s).map_err(|e| anyhow!("invalid percentile value: {e}"))
        }
        _ => Err(anyhow!(
            "yaml value type for 'percentile' should be 'str' or 'float'"
        )),
    }
}

pub fn as_percentile_list(value: &Yaml) -> anyhow::Result<BTreeSet<Percentile>> {
    let mut set = BTreeSet::new();
    match value {
        Yaml::String(s) => {
            for v in s.split(',') {
                let p = Percentile::from_str(v.trim())
                    .map_err(|e| anyhow!("invalid percentile string {v}: {e}"))?;
                set.insert(p);
            }
        }
        Yaml::Array(seq) => {
            for (i, v) in seq.iter().enumerate() {
                let p = as_percentile(v)
                    .context(format!("invalid percentile value for element #{i}"))?;
                set.insert(p);
            }
        }
        _ => {
            return Err(anyhow!(
                "the yaml value type for 'percentile list' should be 'seq' or 'str'"
            ));
        }
    }
    Ok(set)
}

fn as_slo_list(value: &Yaml) -> anyhow::Result<Vec<f64>> {
    match value {
        Yaml::Array(seq) => {
            let mut bounds = Vec::with_capacity(seq.len());
            for (i, v) in seq.iter().enumerate() {
                let f = crate::value::as_f64(v)
                    .context(format!("invalid slo bound value for element #{i}"))?;
                bounds.push(f);
            }
            Ok(bounds)
        }
        _ => {
            let f = crate::value::as_f64(value)?;
            Ok(vec![f])
        }
    }
}

pub fn as_histogram_config(value: &Yaml) -> anyhow::Result<HistogramConfig> {
    if let Yaml::Hash(map) = value {
        let mut config = HistogramConfig::default();
        let mut expiry: Option<Duration> = None;
        let mut buffer_length = HistogramConfig::DEFAULT_BUFFER_LENGTH;
        crate::foreach_kv(map, |k, v| match crate::key::normalize(k).as_str() {
            "minimum_expected_value" | "minimum" | "min" => {
                let f = crate::value::as_f64(v)
                    .context(format!("invalid f64 value for key {k}"))?;
                config.set_minimum_expected_value(f);
                Ok(())
            }
            "maximum_expected_value" | "maximum" | "max" => {
                let f = crate::value::as_f64(v)
                    .context(format!("invalid f64 value for key {k}"))?;
                config.set_maximum_expected_value(f);
                Ok(())
            }
            "precision" | "significant_digits" => {
                let d = crate::value::as_u8(v)
                    .context(format!("invalid u8 value for key {k}"))?;
                config.set_precision(d);
                Ok(())
            }
            "service_level_objectives" | "slo" => {
                let bounds =
                    as_slo_list(v).context(format!("invalid slo bound list for key {k}"))?;
                config.set_service_level_objectives(bounds);
                Ok(())
            }
            "percentiles" | "percentile" => {
                let list = as_percentile_list(v)
                    .context(format!("invalid percentile list value for key {k}"))?;
                config.set_percentile_list(list);
                Ok(())
            }
            "expiry" | "window" => {
                let dur = crate::humanize::as_duration(v)
                    .context(format!("invalid humanize duration value for key {k}"))?;
                expiry = Some(dur);
                Ok(())
            }
            "buffer_length" | "buffers" => {
                buffer_length = crate::value::as_usize(v)
                    .context(format!("invalid usize value for key {k}"))?;
                Ok(())
            }
            _ => Err(anyhow!("invalid key {k}")),
        })?;
        if let Some(expiry) = expiry {
            config.set_window(expiry, buffer_length);
        }
        Ok(config)
    } else {
        let expiry = crate::humanize::as_duration(value).context(
            "the value for simplified form of histogram config should be humanize duration",
        )?;
        Ok(HistogramConfig::with_window(
            expiry,
            HistogramConfig::DEFAULT_BUFFER_LENGTH,
        ))
    }
}
