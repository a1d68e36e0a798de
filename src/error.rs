// src/error.rs

//! Central error type for recipe generation
//!
//! Every failure is fatal to the whole pipeline: there is no
//! catch-and-continue anywhere, errors propagate straight up to `main`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A version-gated tool was requested below its minimum supported version
    #[error("{tool} version not fulfilled: {given}. Minimum required version: {required}.")]
    VersionNotMet {
        tool: String,
        required: String,
        given: String,
    },

    /// A version string failed strict major.minor[.patch] parsing
    #[error("invalid {tool} version '{value}': expected numeric major.minor[.patch]")]
    InvalidVersion { tool: String, value: String },

    /// A recognized option whose handler is not implemented yet
    #[error("{0}: not implemented yet")]
    Unimplemented(String),

    /// SIMD level not present in the lookup table
    #[error("unknown SIMD level '{0}'")]
    UnknownSimd(String),

    /// A handler was invoked on a stage missing an expected precondition
    #[error("implementation error: {0}")]
    Implementation(String),

    /// Engine variant string failed colon/equals parsing
    #[error("malformed engine specification '{0}': expected colon-separated key=value pairs")]
    MalformedEngine(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
