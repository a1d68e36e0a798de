// src/recipe/stage.rs

//! Shared stage machinery
//!
//! The three stage kinds share one construction flow: normalize options,
//! dispatch the residual keys in the fixed global priority order, then cook
//! (serialize) the accumulated instructions. Shared behavior lives in
//! [`StageCore`], per-kind handlers behind the [`StageRecipe`] trait with a
//! statically declared handler table per kind.

use crate::config::BuildConfig;
use crate::container::{
    CmakeInstall, ContainerFormat, ContainerStage, GnuToolchain, Instruction, Toolchain,
};
use crate::error::{Error, Result};
use crate::version;
use strum_macros::Display;
use tracing::debug;

use super::options::{DerivedFlags, OptionValue, StageOptions};

/// The three pipeline stages, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum StageKind {
    Development,
    Application,
    Deployment,
}

impl StageKind {
    /// Stage alias used in the emitted recipe
    pub fn stage_name(self) -> &'static str {
        match self {
            StageKind::Development => "dev_stage",
            StageKind::Application => "app_stage",
            StageKind::Deployment => "deploy_stage",
        }
    }
}

/// Fixed global dispatch priority shared by all stage kinds
///
/// Later handlers depend on state set by earlier ones: the compiler must
/// precede the MPI and FFT library installs, and the application source
/// options must precede the regression-test toggle and the build variant
/// enumeration. This order is a dependency graph, not cosmetics.
pub const DISPATCH_ORDER: [&str; 12] = [
    "format", "ubuntu", "centos", "cuda", "gcc", "cmake", "openmpi", "impi", "fftw", "gromacs",
    "regtest", "engines",
];

/// The subset of a completed stage's state visible to the next stage
///
/// Read-only once published; the pipeline threads it from each stage to its
/// immediate successor.
#[derive(Debug, Clone, Default)]
pub struct StageHandoff {
    /// Compiler capability, present only if a toolchain was installed
    pub toolchain: Option<Toolchain>,
    pub cuda: bool,
    pub mpi: bool,
    pub double_precision: bool,
    /// Installation prefix, present after the application stage
    pub install_prefix: Option<String>,
    /// Generated wrapper binary name, present after the application stage
    pub wrapper: Option<String>,
    /// Runtime instructions the successor appends after its base image
    pub runtime: Vec<Instruction>,
}

/// Behavior each stage kind implements on top of [`StageCore`]
pub trait StageRecipe {
    fn kind(&self) -> StageKind;

    /// Option keys this stage kind handles, a subset of [`DISPATCH_ORDER`]
    fn handler_keys(&self) -> &'static [&'static str];

    /// Route one option to its handler
    fn dispatch(&mut self, key: &str, value: &OptionValue) -> Result<()>;

    fn container(&self) -> &ContainerStage;

    fn format(&self) -> ContainerFormat;

    /// Publish the completed stage's handoff for the next stage
    fn handoff(&self) -> StageHandoff;
}

/// Dispatch residual options in the fixed global priority order
///
/// Only keys present in the residual mapping are dispatched; keys a stage
/// kind declares no handler for are skipped silently.
pub(crate) fn run_dispatch<S: StageRecipe>(stage: &mut S, residual: &StageOptions) -> Result<()> {
    debug_assert!(
        stage
            .handler_keys()
            .iter()
            .all(|key| DISPATCH_ORDER.contains(key)),
        "handler table of the {} stage declares a key missing from the dispatch order",
        stage.kind()
    );

    for key in DISPATCH_ORDER {
        let Some(value) = residual.get(key) else {
            continue;
        };
        if !stage.handler_keys().contains(&key) {
            continue;
        }
        debug!(stage = %stage.kind(), option = key, "dispatching option");
        stage.dispatch(key, value)?;
    }
    Ok(())
}

pub(crate) fn require_str<'v>(key: &str, value: &'v OptionValue) -> Result<&'v str> {
    value
        .as_str()
        .ok_or_else(|| Error::Implementation(format!("option '{key}' expects a string value")))
}

pub(crate) fn require_list<'v>(key: &str, value: &'v OptionValue) -> Result<&'v [String]> {
    value
        .as_list()
        .ok_or_else(|| Error::Implementation(format!("option '{key}' expects a list value")))
}

/// State and handlers shared by every stage kind
#[derive(Debug)]
pub(crate) struct StageCore<'a> {
    pub config: &'a BuildConfig,
    pub flags: DerivedFlags,
    pub container: ContainerStage,
    pub format: ContainerFormat,
    pub compiler: Option<Toolchain>,
    previous_runtime: Vec<Instruction>,
}

impl<'a> StageCore<'a> {
    pub fn new(
        kind: StageKind,
        config: &'a BuildConfig,
        flags: DerivedFlags,
        previous: Option<&StageHandoff>,
    ) -> Self {
        Self {
            config,
            flags,
            container: ContainerStage::new(kind.stage_name()),
            format: ContainerFormat::default(),
            compiler: None,
            previous_runtime: previous.map(|handoff| handoff.runtime.clone()).unwrap_or_default(),
        }
    }

    /// `format` handler: select the recipe output format
    pub fn set_format(&mut self, value: &OptionValue) -> Result<()> {
        let name = require_str("format", value)?;
        self.format = name.parse().map_err(|_| {
            Error::Implementation(format!("unrecognized container format '{name}'"))
        })?;
        Ok(())
    }

    /// `ubuntu` handler: Ubuntu base image
    pub fn ubuntu(&mut self, version: &str) -> Result<()> {
        self.base_image(format!("ubuntu:{version}"))
    }

    /// `centos` handler: CentOS base image
    pub fn centos(&mut self, version: &str) -> Result<()> {
        self.base_image(format!("centos:centos{version}"))
    }

    /// `cuda` handler: GPU base image, recognized but not supported
    pub fn cuda(&mut self) -> Result<()> {
        Err(Error::Unimplemented("cuda".to_string()))
    }

    /// `gcc` handler: GNU toolchain install, publishes the compiler handle
    pub fn gcc(&mut self, version: &str) -> Result<()> {
        let gnu = GnuToolchain::new(version);
        self.compiler = Some(gnu.toolchain());
        self.container.push(Instruction::Compiler(gnu));
        Ok(())
    }

    /// `cmake` handler: version-gated binary install
    pub fn cmake(&mut self, version: &str) -> Result<()> {
        if let Some(required) = self.config.min_version("cmake") {
            version::check("cmake", required, version)?;
        }
        self.container.push(Instruction::Cmake(CmakeInstall::new(version)));
        Ok(())
    }

    /// The compiler handle, required by library installs
    pub fn toolchain_for(&self, tool: &str) -> Result<Toolchain> {
        self.compiler.clone().ok_or_else(|| {
            Error::Implementation(format!(
                "{tool} requested before a compiler toolchain was installed"
            ))
        })
    }

    fn base_image(&mut self, image: String) -> Result<()> {
        if self.flags.cuda {
            // The GPU base image is selected by the cuda handler instead.
            return Ok(());
        }
        if self.container.has_base_image() {
            return Err(Error::Implementation(format!(
                "{} already has a base image",
                self.container.name()
            )));
        }
        self.container.push(Instruction::BaseImage {
            image,
            stage_name: self.container.name().to_string(),
        });
        let runtime = std::mem::take(&mut self.previous_runtime);
        self.container.extend(runtime);
        Ok(())
    }

    /// Handoff with the shared fields filled in
    pub fn handoff(&self) -> StageHandoff {
        StageHandoff {
            toolchain: self.compiler.clone(),
            cuda: self.flags.cuda,
            mpi: self.flags.mpi,
            double_precision: self.flags.double_precision,
            install_prefix: None,
            wrapper: None,
            runtime: self.container.runtime(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core(config: &BuildConfig) -> StageCore<'_> {
        StageCore::new(
            StageKind::Development,
            config,
            DerivedFlags::default(),
            None,
        )
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(StageKind::Development.stage_name(), "dev_stage");
        assert_eq!(StageKind::Application.stage_name(), "app_stage");
        assert_eq!(StageKind::Deployment.stage_name(), "deploy_stage");
    }

    #[test]
    fn test_second_base_image_rejected() {
        let config = BuildConfig::default();
        let mut core = core(&config);
        core.ubuntu("18.04").unwrap();
        assert!(matches!(
            core.centos("7"),
            Err(Error::Implementation(_))
        ));
    }

    #[test]
    fn test_base_image_skipped_on_gpu_path() {
        let config = BuildConfig::default();
        let mut core = core(&config);
        core.flags.cuda = true;
        core.ubuntu("18.04").unwrap();
        assert!(!core.container.has_base_image());
    }

    #[test]
    fn test_predecessor_runtime_follows_base_image() {
        let config = BuildConfig::default();
        let handoff = StageHandoff {
            runtime: vec![Instruction::Comment("carried forward".to_string())],
            ..StageHandoff::default()
        };
        let mut core = StageCore::new(
            StageKind::Application,
            &config,
            DerivedFlags::default(),
            Some(&handoff),
        );
        core.ubuntu("18.04").unwrap();

        let instructions = core.container.instructions();
        assert!(matches!(instructions[0], Instruction::BaseImage { .. }));
        assert_eq!(
            instructions[1],
            Instruction::Comment("carried forward".to_string())
        );
    }

    #[test]
    fn test_cmake_gate_appends_nothing_on_failure() {
        let mut config = BuildConfig::default();
        config
            .min_versions
            .insert("cmake".to_string(), "3.13".to_string());
        let mut core = StageCore::new(
            StageKind::Development,
            &config,
            DerivedFlags::default(),
            None,
        );
        let err = core.cmake("3.1").unwrap_err();
        assert!(matches!(err, Error::VersionNotMet { .. }));
        assert!(core.container.instructions().is_empty());
    }

    #[test]
    fn test_cmake_gate_passes_and_installs() {
        let config = BuildConfig::default();
        let mut core = core(&config);
        core.cmake("3.17.1").unwrap();
        assert!(matches!(
            core.container.instructions()[0],
            Instruction::Cmake(_)
        ));
    }

    #[test]
    fn test_toolchain_missing_is_implementation_error() {
        let config = BuildConfig::default();
        let core = core(&config);
        assert!(matches!(
            core.toolchain_for("openmpi"),
            Err(Error::Implementation(_))
        ));
    }

    #[test]
    fn test_set_format() {
        let config = BuildConfig::default();
        let mut core = core(&config);
        core.set_format(&OptionValue::Str("singularity".to_string()))
            .unwrap();
        assert_eq!(core.format, ContainerFormat::Singularity);
        assert!(core
            .set_format(&OptionValue::Str("oci".to_string()))
            .is_err());
    }
}
