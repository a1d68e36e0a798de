// src/recipe/mod.rs

//! Multi-stage recipe composition
//!
//! A recipe is cooked in up to three stages, each built from its own option
//! mapping and the completed predecessor's handoff:
//!
//! - **Development**: base image, compiler toolchain, MPI and FFT libraries
//! - **Application**: GROMACS source fetch plus one configure-build-install
//!   sequence per requested engine variant
//! - **Deployment**: minimal runtime image with the wrapper and chooser
//!   scripts on the search path
//!
//! Stage construction is strictly sequential. Options are dispatched in one
//! fixed global priority order; flag-like options are folded into derived
//! flags by the normalizer before dispatch.

mod application;
mod deployment;
mod development;
mod engine;
mod options;
mod pipeline;
mod stage;
mod template;

pub use application::ApplicationStage;
pub use deployment::DeploymentStage;
pub use development::DevelopmentStage;
pub use engine::EngineSpec;
pub use options::{normalize, DerivedFlags, OptionValue, StageOptions};
pub use pipeline::Pipeline;
pub use stage::{StageHandoff, StageKind, StageRecipe, DISPATCH_ORDER};
pub use template::Template;
