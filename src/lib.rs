// src/lib.rs

//! gmxforge
//!
//! Multi-stage container recipe generator for GROMACS builds. Emits a
//! Dockerfile or Singularity definition for a development → application →
//! deployment pipeline, parameterized by compiler, MPI, GPU, SIMD and
//! precision options.
//!
//! # Architecture
//!
//! - Stages are built strictly in order; each publishes a narrow handoff
//!   (toolchain handle, feature flags, install prefix, wrapper name) that
//!   the next stage consumes
//! - Option dispatch follows one fixed global priority order, because later
//!   handlers depend on state set by earlier ones
//! - One configure-option template is expanded per requested engine
//!   variant, producing one independent build per SIMD/precision/MPI
//!   combination
//! - The generator only composes recipe text; it never executes builds

pub mod cli;
pub mod config;
pub mod container;
mod error;
pub mod recipe;
pub mod version;

pub use config::{BuildConfig, SuffixTokens};
pub use container::{ContainerFormat, ContainerStage, Instruction, Toolchain};
pub use error::{Error, Result};
pub use recipe::{
    normalize, ApplicationStage, DeploymentStage, DerivedFlags, DevelopmentStage, EngineSpec,
    OptionValue, Pipeline, StageHandoff, StageKind, StageOptions, StageRecipe, Template,
};
