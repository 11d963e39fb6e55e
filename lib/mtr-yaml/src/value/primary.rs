/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;

use anyhow::anyhow;
use yaml_rust::Yaml;

pub fn as_u8(v: &Yaml) -> anyhow::Result<u8> {
    match v {
        Yaml::String(s) => Ok(u8::from_str(s)?),
        Yaml::Integer(i) => Ok(u8::try_from(*i)?),
        _ => Err(anyhow!(
            "yaml value type for 'u8' should be 'string' or 'integer'"
        )),
    }
}

pub fn as_usize(v: &Yaml) -> anyhow::Result<usize> {
    match v {
        Yaml::String(s) => Ok(usize::from_str(s)?),
        Yaml::Integer(i) => Ok(usize::try_from(*i)?),
        _ => Err(anyhow!(
            "yaml value type for 'usize' should be 'string' or 'integer'"
        )),
    }
}

pub fn as_f64(v: &Yaml) -> anyhow::Result<f64> {
    match v {
        Yaml::String(s) => Ok(f64::from_str(s)?),
        Yaml::Integer(i) => Ok(*i as f64),
        Yaml::Real(s) => Ok(f64::from_str(s)?),
        _ => Err(anyhow!(
            "yaml value type for 'f64' should be 'string', 'integer' or 'real'"
        )),
    }
}
