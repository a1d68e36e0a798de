// src/version/mod.rs

//! Strict version parsing and minimum-version gating
//!
//! Version-gated tools (cmake, openmpi) must satisfy a configured minimum
//! before any recipe instruction for them is appended. Version strings are
//! parsed under strict rules: exactly `major.minor[.patch]`, numeric
//! components, nothing else.

use crate::error::{Error, Result};
use semver::Version;
use std::cmp::Ordering;
use std::fmt;

/// A strictly parsed `major.minor[.patch]` version
#[derive(Debug, Clone)]
pub struct StrictVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: Option<u64>,
}

impl StrictVersion {
    /// Parse a strict version string
    ///
    /// Accepted: "3.13", "3.9.6". Rejected: "3", "3.9.6.1", "3.x",
    /// "v3.13", "3.13-rc1", empty components. The tool name is carried
    /// only for error context.
    pub fn parse(tool: &str, s: &str) -> Result<Self> {
        let invalid = || Error::InvalidVersion {
            tool: tool.to_string(),
            value: s.to_string(),
        };

        let mut components = Vec::with_capacity(3);
        for part in s.split('.') {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            components.push(part.parse::<u64>().map_err(|_| invalid())?);
        }

        match components.as_slice() {
            [major, minor] => Ok(Self {
                major: *major,
                minor: *minor,
                patch: None,
            }),
            [major, minor, patch] => Ok(Self {
                major: *major,
                minor: *minor,
                patch: Some(*patch),
            }),
            _ => Err(invalid()),
        }
    }

    /// Convert to a semver::Version for comparison (missing patch = 0)
    fn to_semver(&self) -> Version {
        Version::new(self.major, self.minor, self.patch.unwrap_or(0))
    }
}

impl fmt::Display for StrictVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if let Some(patch) = self.patch {
            write!(f, ".{}", patch)?;
        }
        Ok(())
    }
}

impl PartialEq for StrictVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for StrictVersion {}

impl Ord for StrictVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_semver().cmp(&other.to_semver())
    }
}

impl PartialOrd for StrictVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Check a supplied tool version against the required minimum
///
/// Returns `Ok(true)` when `given >= required`. Fails with
/// [`Error::VersionNotMet`] when the given version is strictly older, and
/// with [`Error::InvalidVersion`] when either string fails strict parsing.
/// Callers must use this as a precondition gate: no instruction for the
/// tool may be appended before the check passes.
pub fn check(tool: &str, required: &str, given: &str) -> Result<bool> {
    let required_version = StrictVersion::parse(tool, required)?;
    let given_version = StrictVersion::parse(tool, given)?;

    if given_version < required_version {
        return Err(Error::VersionNotMet {
            tool: tool.to_string(),
            required: required.to_string(),
            given: given.to_string(),
        });
    }
    Ok(true)
}
