// src/recipe/engine.rs

//! Engine variant specifications
//!
//! One engine spec describes one requested build variant as a mapping of
//! variant dimensions (`simd`, `rdtscp`, ...) to values, parsed from a
//! colon-delimited, equals-separated CLI string. The `simd` value goes
//! through the configured lookup table into the GROMACS build vocabulary;
//! every other value is upper-cased.

use crate::config::BuildConfig;
use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// One requested build variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSpec {
    dimensions: BTreeMap<String, String>,
}

impl EngineSpec {
    /// Parse a `"simd=avx2 : rdtscp=on"` style specification
    pub fn parse(raw: &str, config: &BuildConfig) -> Result<Self> {
        let malformed = || Error::MalformedEngine(raw.to_string());

        let mut dimensions = BTreeMap::new();
        for entry in raw.split(':') {
            let entry = entry.trim();
            if entry.is_empty() {
                return Err(malformed());
            }
            let (key, value) = entry.split_once('=').ok_or_else(malformed)?;
            let (key, value) = (key.trim(), value.trim());
            if key.is_empty() || value.is_empty() {
                return Err(malformed());
            }

            let resolved = if key == "simd" {
                config
                    .simd_table
                    .get(&value.to_lowercase())
                    .cloned()
                    .ok_or_else(|| Error::UnknownSimd(value.to_string()))?
            } else {
                value.to_uppercase()
            };
            dimensions.insert(key.to_string(), resolved);
        }

        if !dimensions.contains_key("simd") {
            return Err(malformed());
        }
        Ok(Self { dimensions })
    }

    /// The mapped SIMD token, e.g. `AVX2_256`
    pub fn simd(&self) -> &str {
        self.dimensions["simd"].as_str()
    }

    /// Whether the RDTSCP hardware counter dimension is on (default off)
    pub fn rdtscp_enabled(&self) -> bool {
        self.dimensions
            .get("rdtscp")
            .map(|value| value == "ON")
            .unwrap_or(false)
    }

    /// All dimension name/value pairs
    pub fn dimensions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.dimensions
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}
