// src/container/mod.rs

//! Container recipe primitives
//!
//! The instruction vocabulary a build stage accumulates and the building
//! blocks that install whole tools as single instructions. This layer has no
//! recipe logic of its own: it renders whatever the stage builders append,
//! in the order they append it, to Dockerfile or Singularity definition
//! text.
//!
//! - Primitives: base image, package list, shell commands, file copy,
//!   environment variables, comments.
//! - Building blocks: GNU toolchain, CMake, OpenMPI, FFTW, Python and a
//!   generic fetch-configure-build-install cmake project. Blocks lower to
//!   primitives at render time and know their runtime form for multi-stage
//!   copies.

mod blocks;
mod instruction;
mod stage;

use strum_macros::{Display, EnumString};

pub use blocks::{
    CmakeInstall, FftwInstall, GenericCmakeBuild, GnuToolchain, OpenMpiInstall, PythonInstall,
    Toolchain,
};
pub use instruction::Instruction;
pub use stage::ContainerStage;

/// Output format of the serialized recipe document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ContainerFormat {
    #[default]
    Docker,
    Singularity,
}
