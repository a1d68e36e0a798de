// src/recipe/options.rs

//! Stage option values and the option normalizer
//!
//! Each stage is constructed from a mapping of option keys to values built
//! by the CLI adapter. Normalization is a pure function: it derives the
//! stage-scoped flags and returns the residual mapping for handler
//! dispatch, instead of draining a shared mutable mapping in place.

use super::stage::StageKind;
use std::collections::BTreeMap;

/// Value of a single stage option
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Str(String),
    Bool(bool),
    List(Vec<String>),
}

impl OptionValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            OptionValue::List(values) => Some(values),
            _ => None,
        }
    }

    /// Truthiness of an option: a bare boolean, or presence of content
    pub fn is_enabled(&self) -> bool {
        match self {
            OptionValue::Bool(enabled) => *enabled,
            OptionValue::Str(value) => !value.is_empty(),
            OptionValue::List(values) => !values.is_empty(),
        }
    }
}

/// Raw option mapping for one stage, keyed by option name
pub type StageOptions = BTreeMap<String, OptionValue>;

/// Flags derived from a stage's options during normalization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DerivedFlags {
    /// Double precision build requested
    pub double_precision: bool,
    /// GPU path requested
    pub cuda: bool,
    /// An MPI library is part of the build (Application stage only)
    pub mpi: bool,
    /// FFTW is installed by the development stage (Application stage only)
    pub fftw_installed: bool,
}

/// Derive stage-scoped flags and return the residual options for dispatch
///
/// Missing keys mean "not enabled", never an error, so normalizing an
/// already-reduced mapping is a no-op. The `double` key is always removed;
/// `cuda` stays (it dispatches to the GPU base-image handler). On the
/// Application stage `openmpi`/`impi`/`fftw` are consumed into flags and
/// removed so they can never be dispatched twice.
pub fn normalize(kind: StageKind, mut options: StageOptions) -> (DerivedFlags, StageOptions) {
    let double_precision = options
        .remove("double")
        .map(|value| value.is_enabled())
        .unwrap_or(false);
    let cuda = options
        .get("cuda")
        .map(OptionValue::is_enabled)
        .unwrap_or(false);

    let (mpi, fftw_installed) = if kind == StageKind::Application {
        let openmpi = options.remove("openmpi").is_some();
        let impi = options.remove("impi").is_some();
        let fftw = options.remove("fftw").is_some();
        (openmpi || impi, fftw)
    } else {
        (false, false)
    };

    (
        DerivedFlags {
            double_precision,
            cuda,
            mpi,
            fftw_installed,
        },
        options,
    )
}
