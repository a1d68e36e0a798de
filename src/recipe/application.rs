// src/recipe/application.rs

//! Application stage: fetch, configure and build GROMACS
//!
//! One shared configure-option template is prepared from the stage's flags,
//! then expanded once per requested engine variant. Every variant reuses
//! the same source fetch and installs into the same prefix under
//! suffix-disambiguated binary and library names.

use crate::config::BuildConfig;
use crate::container::{ContainerFormat, ContainerStage, GenericCmakeBuild, Instruction};
use crate::error::{Error, Result};
use tracing::debug;

use super::engine::EngineSpec;
use super::options::{normalize, OptionValue, StageOptions};
use super::stage::{
    require_list, require_str, run_dispatch, StageCore, StageHandoff, StageKind, StageRecipe,
};
use super::template::Template;

/// Configure-option template shared by every engine variant
///
/// `$bin_suffix$`, `$libs_suffix$` and the engine dimensions stay latent
/// until the per-variant expansion pass.
const CMAKE_OPTS: &str = "-DCMAKE_INSTALL_BINDIR=bin.$simd$ \
    -DCMAKE_INSTALL_LIBDIR=lib.$simd$ \
    -DCMAKE_C_COMPILER=$c_compiler$ \
    -DCMAKE_CXX_COMPILER=$cxx_compiler$ \
    -DGMX_OPENMP=ON \
    -DGMX_MPI=$mpi$ \
    -DGMX_GPU=$cuda$ \
    -DGMX_SIMD=$simd$ \
    -DGMX_USE_RDTSCP=$rdtscp$ \
    -DGMX_DOUBLE=$double$ \
    -D$fft$ \
    -DGMX_EXTERNAL_BLAS=OFF \
    -DGMX_EXTERNAL_LAPACK=OFF \
    -DBUILD_SHARED_LIBS=OFF \
    -DGMX_PREFER_STATIC_LIBS=ON \
    -DREGRESSIONTEST_DOWNLOAD=$regtest$ \
    -DGMX_DEFAULT_SUFFIX=OFF \
    -DGMX_BINARY_SUFFIX=$bin_suffix$ \
    -DGMX_LIBS_SUFFIX=$libs_suffix$";

/// OS packages the application stage needs beyond the base image
const OS_PACKAGES: [&str; 1] = ["wget"];

/// Source and template state prepared by the `gromacs` handler
#[derive(Debug, Clone)]
struct SourcePlan {
    /// Unpacked source directory, relative to /var/tmp
    directory: String,
    /// Per-variant build directory template, relative to the source
    build_directory: Template,
    /// Installation prefix inside the image
    prefix: String,
    /// Source tarball URL
    url: String,
    /// Base configure-option template
    cmake_template: Template,
    /// Wrapper binary name, e.g. `gmx_mpi_d`
    wrapper: String,
}

#[derive(Debug)]
pub struct ApplicationStage<'a> {
    core: StageCore<'a>,
    regtest_enabled: bool,
    plan: Option<SourcePlan>,
    build_environment: Vec<(String, String)>,
    preconfigure: Vec<String>,
    check: bool,
}

impl<'a> ApplicationStage<'a> {
    const HANDLER_KEYS: &'static [&'static str] = &[
        "format", "ubuntu", "centos", "cuda", "gcc", "cmake", "gromacs", "regtest", "engines",
    ];

    /// Construct the stage: normalize, dispatch, ready to cook
    pub fn build(
        options: StageOptions,
        previous: Option<&StageHandoff>,
        config: &'a BuildConfig,
    ) -> Result<Self> {
        let (flags, residual) = normalize(StageKind::Application, options);
        // The regression-test toggle feeds the shared template before its
        // own handler runs, so it is read ahead of dispatch.
        let regtest_enabled = residual
            .get("regtest")
            .map(OptionValue::is_enabled)
            .unwrap_or(false);

        let mut stage = Self {
            core: StageCore::new(StageKind::Application, config, flags, previous),
            regtest_enabled,
            plan: None,
            build_environment: Vec::new(),
            preconfigure: Vec::new(),
            check: false,
        };
        run_dispatch(&mut stage, &residual)?;
        Ok(stage)
    }

    /// `gromacs` handler: OS packages plus the shared source plan
    fn gromacs(&mut self, version: &str) -> Result<()> {
        self.core.container.push(Instruction::Packages {
            packages: OS_PACKAGES.iter().map(|package| package.to_string()).collect(),
        });

        let config = self.core.config;
        let flags = self.core.flags;
        let wrapper_suffix = config
            .suffix_tokens
            .wrapper_suffix(flags.mpi, flags.double_precision);

        let cmake_template = self.base_cmake_template();
        self.plan = Some(SourcePlan {
            directory: format!("gromacs-{version}"),
            build_directory: Template::new("build.$simd$"),
            prefix: config.install_prefix.clone(),
            url: config.source_url(version),
            cmake_template,
            wrapper: format!("gmx{wrapper_suffix}"),
        });
        Ok(())
    }

    /// Resolve every flag-driven placeholder of the shared template
    fn base_cmake_template(&mut self) -> Template {
        let flags = self.core.flags;
        let mut template = Template::new(CMAKE_OPTS);

        template = if flags.mpi {
            template
                .substitute("c_compiler", "mpicc")
                .substitute("cxx_compiler", "mpicxx")
                .substitute("mpi", "ON")
        } else {
            template
                .substitute("c_compiler", "gcc")
                .substitute("cxx_compiler", "g++")
                .substitute("mpi", "OFF")
        };

        template = if flags.fftw_installed {
            self.build_environment.push((
                "CMAKE_PREFIX_PATH".to_string(),
                "'/usr/local/fftw'".to_string(),
            ));
            template.substitute("fft", "GMX_FFT_LIBRARY=fftw3")
        } else {
            template.substitute("fft", "GMX_BUILD_OWN_FFTW=ON")
        };

        for (name, enabled) in [
            ("cuda", flags.cuda),
            ("regtest", self.regtest_enabled),
            ("double", flags.double_precision),
        ] {
            template = template.substitute(name, if enabled { "ON" } else { "OFF" });
        }
        template
    }

    /// `regtest` handler: check target, MPI preflags, build prerequisites
    fn regtest(&mut self, value: &OptionValue) -> Result<()> {
        if !value.is_enabled() {
            return Ok(());
        }
        let plan = self.plan.as_mut().ok_or_else(|| {
            Error::Implementation(
                "regression tests requested before the gromacs source options were prepared"
                    .to_string(),
            )
        })?;

        if self.core.flags.mpi {
            plan.cmake_template = Template::new(format!(
                "{} -DMPIEXEC_PREFLAGS='--allow-run-as-root;--oversubscribe'",
                plan.cmake_template.text()
            ));
        }
        self.preconfigure = vec![
            "apt-get update".to_string(),
            "apt-get upgrade -y".to_string(),
            "apt-get install -y perl".to_string(),
        ];
        self.check = true;
        Ok(())
    }

    /// `engines` handler: one build instruction sequence per variant
    fn engines(&mut self, specs: &[String]) -> Result<()> {
        let plan = self
            .plan
            .clone()
            .ok_or_else(|| {
                Error::Implementation(
                    "engine enumeration requested before the gromacs source options were prepared"
                        .to_string(),
                )
            })?;
        let flags = self.core.flags;

        for raw in specs {
            let engine = EngineSpec::parse(raw, self.core.config)?;
            let suffix = self.core.config.suffix_tokens.binary_suffix(
                flags.mpi,
                flags.double_precision,
                engine.rdtscp_enabled(),
            );

            // Each variant expands its own copy of the shared template.
            // The rdtscp dimension defaults to off when the spec omits it.
            let mut opts = plan
                .cmake_template
                .clone()
                .substitute("bin_suffix", &suffix)
                .substitute("libs_suffix", &suffix)
                .substitute("rdtscp", if engine.rdtscp_enabled() { "ON" } else { "OFF" });
            for (key, value) in engine.dimensions() {
                opts = opts.substitute(key, value);
            }

            debug!(simd = engine.simd(), suffix = %suffix, "engine variant");
            self.core.container.push(Instruction::GenericBuild(GenericCmakeBuild {
                url: plan.url.clone(),
                directory: plan.directory.clone(),
                build_directory: plan
                    .build_directory
                    .clone()
                    .substitute("simd", engine.simd())
                    .text()
                    .to_string(),
                prefix: plan.prefix.clone(),
                build_environment: self.build_environment.clone(),
                cmake_opts: opts.words(),
                preconfigure: self.preconfigure.clone(),
                check: self.check,
            }));
        }
        Ok(())
    }
}

impl StageRecipe for ApplicationStage<'_> {
    fn kind(&self) -> StageKind {
        StageKind::Application
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
            "gromacs" => self.gromacs(require_str(key, value)?),
            "regtest" => self.regtest(value),
            "engines" => self.engines(require_list(key, value)?),
            _ => Err(Error::Implementation(format!(
                "application stage has no handler for option '{key}'"
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
        let mut handoff = self.core.handoff();
        if let Some(plan) = &self.plan {
            handoff.install_prefix = Some(plan.prefix.clone());
            handoff.wrapper = Some(plan.wrapper.clone());
        }
        handoff
    }
}
