// src/recipe/development.rs

//! Development stage: base image, compiler toolchain, numerical and MPI
//! libraries
//!
//! Everything installed here is either consumed while building GROMACS in
//! the application stage or carried forward through runtime instructions.

use crate::config::BuildConfig;
use crate::container::{ContainerFormat, ContainerStage, FftwInstall, Instruction, OpenMpiInstall};
use crate::error::{Error, Result};
use crate::version;

use super::options::{normalize, OptionValue, StageOptions};
use super::stage::{require_str, run_dispatch, StageCore, StageHandoff, StageKind, StageRecipe};

/// FFTW configure options; every SIMD family GROMACS may select at runtime
/// must be compiled in
const FFTW_CONFIGURE_OPTS: [&str; 6] = [
    "--enable-shared",
    "--disable-static",
    "--enable-sse2",
    "--enable-avx",
    "--enable-avx2",
    "--enable-avx512",
];

#[derive(Debug)]
pub struct DevelopmentStage<'a> {
    core: StageCore<'a>,
}

impl<'a> DevelopmentStage<'a> {
    const HANDLER_KEYS: &'static [&'static str] = &[
        "format", "ubuntu", "centos", "cuda", "gcc", "cmake", "openmpi", "impi", "fftw",
    ];

    /// Construct the stage: normalize, dispatch, ready to cook
    pub fn build(
        options: StageOptions,
        previous: Option<&StageHandoff>,
        config: &'a BuildConfig,
    ) -> Result<Self> {
        let (flags, residual) = normalize(StageKind::Development, options);
        let mut stage = Self {
            core: StageCore::new(StageKind::Development, config, flags, previous),
        };
        run_dispatch(&mut stage, &residual)?;
        Ok(stage)
    }

    /// `openmpi` handler: version-gated, needs the stage's toolchain
    fn openmpi(&mut self, version: &str) -> Result<()> {
        if let Some(required) = self.core.config.min_version("openmpi") {
            version::check("openmpi", required, version)?;
        }
        let toolchain = self.core.toolchain_for("openmpi")?;
        self.core.container.push(Instruction::OpenMpi(OpenMpiInstall::new(
            version,
            &toolchain,
            self.core.flags.cuda,
        )));
        Ok(())
    }

    /// `fftw` handler: needs the stage's toolchain
    fn fftw(&mut self, version: &str) -> Result<()> {
        let toolchain = self.core.toolchain_for("fftw")?;
        let mut configure_opts: Vec<String> =
            FFTW_CONFIGURE_OPTS.iter().map(|opt| opt.to_string()).collect();
        if !self.core.flags.double_precision {
            configure_opts.push("--enable-float".to_string());
        }
        self.core.container.push(Instruction::Fftw(FftwInstall::new(
            version,
            &toolchain,
            configure_opts,
        )));
        Ok(())
    }
}

impl StageRecipe for DevelopmentStage<'_> {
    fn kind(&self) -> StageKind {
        StageKind::Development
    }

    fn handler_keys(&self) -> &'static [&'static str] {
        Self::HANDLER_KEYS
    }

    fn dispatch(&mut self, key: &str, value: &OptionValue) -> Result<()> {
        match key {
            "format" => self.core.set_format(value),
            "ubuntu" => self.core.ubuntu(require_str(key, value)?),
            "centos" => self.core.centos(require_str(key, value)?),
            "cuda" => self.core.cuda(),
            "gcc" => self.core.gcc(require_str(key, value)?),
            "cmake" => self.core.cmake(require_str(key, value)?),
            "openmpi" => self.openmpi(require_str(key, value)?),
            "impi" => Err(Error::Unimplemented("impi".to_string())),
            "fftw" => self.fftw(require_str(key, value)?),
            _ => Err(Error::Implementation(format!(
                "development stage has no handler for option '{key}'"
            ))),
        }
    }

    fn container(&self) -> &ContainerStage {
        &self.core.container
    }

    fn format(&self) -> ContainerFormat {
        self.core.format
    }

    fn handoff(&self) -> StageHandoff {
        self.core.handoff()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(value: &str) -> OptionValue {
        OptionValue::Str(value.to_string())
    }

    fn base_options() -> StageOptions {
        StageOptions::from([
            ("ubuntu".to_string(), option("18.04")),
            ("gcc".to_string(), option("9")),
        ])
    }

    #[test]
    fn test_compiler_dispatched_before_mpi() {
        let config = BuildConfig::default();
        let mut options = base_options();
        options.insert("openmpi".to_string(), option("3.1.4"));

        let stage = DevelopmentStage::build(options, None, &config).unwrap();
        let instructions = stage.container().instructions();

        let compiler = instructions
            .iter()
            .position(|i| matches!(i, Instruction::Compiler(_)))
            .unwrap();
        let openmpi = instructions
            .iter()
            .position(|i| matches!(i, Instruction::OpenMpi(_)))
            .unwrap();
        assert!(compiler < openmpi);
        assert!(stage.handoff().toolchain.is_some());
    }

    #[test]
    fn test_mpi_without_compiler_is_implementation_error() {
        let config = BuildConfig::default();
        let options = StageOptions::from([
            ("ubuntu".to_string(), option("18.04")),
            ("openmpi".to_string(), option("3.1.4")),
        ]);
        let err = DevelopmentStage::build(options, None, &config).unwrap_err();
        assert!(matches!(err, Error::Implementation(_)));
    }

    #[test]
    fn test_fftw_without_compiler_is_implementation_error() {
        let config = BuildConfig::default();
        let options = StageOptions::from([
            ("ubuntu".to_string(), option("18.04")),
            ("fftw".to_string(), option("3.3.7")),
        ]);
        let err = DevelopmentStage::build(options, None, &config).unwrap_err();
        assert!(matches!(err, Error::Implementation(_)));
    }

    #[test]
    fn test_openmpi_below_minimum_fails_whole_stage() {
        let config = BuildConfig::default();
        let mut options = base_options();
        options.insert("openmpi".to_string(), option("2.1.1"));
        let err = DevelopmentStage::build(options, None, &config).unwrap_err();
        assert!(matches!(err, Error::VersionNotMet { .. }));
    }

    #[test]
    fn test_fftw_single_precision_by_default() {
        let config = BuildConfig::default();
        let mut options = base_options();
        options.insert("fftw".to_string(), option("3.3.7"));
        let stage = DevelopmentStage::build(options, None, &config).unwrap();
        let rendered = stage.container().render(ContainerFormat::Docker);
        assert!(rendered.contains("--enable-float"));
    }

    #[test]
    fn test_fftw_double_precision_drops_float() {
        let config = BuildConfig::default();
        let mut options = base_options();
        options.insert("fftw".to_string(), option("3.3.7"));
        options.insert("double".to_string(), OptionValue::Bool(true));
        let stage = DevelopmentStage::build(options, None, &config).unwrap();
        let rendered = stage.container().render(ContainerFormat::Docker);
        assert!(!rendered.contains("--enable-float"));
    }

    #[test]
    fn test_cuda_base_image_unimplemented() {
        let config = BuildConfig::default();
        let mut options = base_options();
        options.insert("cuda".to_string(), option("10.2"));
        let err = DevelopmentStage::build(options, None, &config).unwrap_err();
        assert!(matches!(err, Error::Unimplemented(feature) if feature == "cuda"));
    }

    #[test]
    fn test_exactly_one_base_image() {
        let config = BuildConfig::default();
        let stage = DevelopmentStage::build(base_options(), None, &config).unwrap();
        let images = stage
            .container()
            .instructions()
            .iter()
            .filter(|i| matches!(i, Instruction::BaseImage { .. }))
            .count();
        assert_eq!(images, 1);
    }

    #[test]
    fn test_handoff_publishes_runtime() {
        let config = BuildConfig::default();
        let stage = DevelopmentStage::build(base_options(), None, &config).unwrap();
        let handoff = stage.handoff();
        assert!(!handoff.runtime.is_empty());
        assert!(!handoff.cuda);
    }
}
