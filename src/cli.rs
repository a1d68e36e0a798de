// src/cli.rs

//! CLI definitions for the recipe generator
//!
//! This module only parses flags and materializes the per-stage option
//! mappings; all recipe logic lives in the `recipe` module.

use clap::{Parser, ValueEnum};

use crate::recipe::{OptionValue, StageKind, StageOptions};

/// Base distribution used when neither --ubuntu nor --centos is given
const DEFAULT_UBUNTU: &str = "18.04";

/// Engine variant built when no --engines is given
const DEFAULT_ENGINE: &str = "simd=sse2";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Docker,
    Singularity,
}

impl FormatArg {
    fn as_str(self) -> &'static str {
        match self {
            FormatArg::Docker => "docker",
            FormatArg::Singularity => "singularity",
        }
    }
}

impl std::fmt::Display for FormatArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Parser)]
#[command(name = "gmxforge")]
#[command(author = "gmxforge Contributors")]
#[command(version)]
#[command(
    about = "Multi-stage container recipe generator for GROMACS builds",
    long_about = None
)]
pub struct Cli {
    /// Recipe format to emit
    #[arg(long, value_enum, value_name = "FORMAT", default_value_t = FormatArg::Docker)]
    pub format: FormatArg,

    /// Ubuntu base distribution version
    #[arg(long, value_name = "VERSION", group = "distro")]
    pub ubuntu: Option<String>,

    /// CentOS base distribution version
    #[arg(long, value_name = "VERSION", group = "distro")]
    pub centos: Option<String>,

    /// CUDA base image version (GPU builds)
    #[arg(long, value_name = "VERSION")]
    pub cuda: Option<String>,

    /// GNU compiler version
    #[arg(long, value_name = "VERSION", default_value = "9")]
    pub gcc: String,

    /// CMake version
    #[arg(long, value_name = "VERSION", default_value = "3.17.1")]
    pub cmake: String,

    /// OpenMPI version (enables MPI builds)
    #[arg(long, value_name = "VERSION", group = "mpi")]
    pub openmpi: Option<String>,

    /// Intel MPI version (enables MPI builds)
    #[arg(long, value_name = "VERSION", group = "mpi")]
    pub impi: Option<String>,

    /// FFTW version (without it GROMACS builds its own FFTW)
    #[arg(long, value_name = "VERSION")]
    pub fftw: Option<String>,

    /// GROMACS version to build
    #[arg(long, value_name = "VERSION", default_value = "2020.1")]
    pub gromacs: String,

    /// Download and run the regression tests during the build
    #[arg(long)]
    pub regtest: bool,

    /// Build double precision binaries
    #[arg(long)]
    pub double: bool,

    /// Engine variant, e.g. "simd=avx2:rdtscp=on" (repeatable)
    #[arg(long = "engines", value_name = "SPEC")]
    pub engines: Vec<String>,
}

impl Cli {
    /// Materialize the per-stage option mappings, in pipeline order
    pub fn stages(&self) -> Vec<(StageKind, StageOptions)> {
        let mut development = StageOptions::new();
        self.common(&mut development);
        insert_str(&mut development, "gcc", &self.gcc);
        insert_str(&mut development, "cmake", &self.cmake);
        self.mpi_library(&mut development);
        if let Some(fftw) = &self.fftw {
            insert_str(&mut development, "fftw", fftw);
        }

        let mut application = StageOptions::new();
        self.common(&mut application);
        insert_str(&mut application, "gcc", &self.gcc);
        insert_str(&mut application, "cmake", &self.cmake);
        insert_str(&mut application, "gromacs", &self.gromacs);
        if self.regtest {
            application.insert("regtest".to_string(), OptionValue::Bool(true));
        }
        let engines = if self.engines.is_empty() {
            vec![DEFAULT_ENGINE.to_string()]
        } else {
            self.engines.clone()
        };
        application.insert("engines".to_string(), OptionValue::List(engines));
        // Passed through for flag derivation only; the normalizer consumes
        // them before dispatch.
        self.mpi_library(&mut application);
        if let Some(fftw) = &self.fftw {
            insert_str(&mut application, "fftw", fftw);
        }

        let mut deployment = StageOptions::new();
        self.common(&mut deployment);

        vec![
            (StageKind::Development, development),
            (StageKind::Application, application),
            (StageKind::Deployment, deployment),
        ]
    }

    /// Options every stage receives: format, base distribution, toggles
    fn common(&self, options: &mut StageOptions) {
        insert_str(options, "format", self.format.as_str());
        if let Some(centos) = &self.centos {
            insert_str(options, "centos", centos);
        } else {
            let ubuntu = self.ubuntu.as_deref().unwrap_or(DEFAULT_UBUNTU);
            insert_str(options, "ubuntu", ubuntu);
        }
        if let Some(cuda) = &self.cuda {
            insert_str(options, "cuda", cuda);
        }
        if self.double {
            options.insert("double".to_string(), OptionValue::Bool(true));
        }
    }

    fn mpi_library(&self, options: &mut StageOptions) {
        if let Some(openmpi) = &self.openmpi {
            insert_str(options, "openmpi", openmpi);
        } else if let Some(impi) = &self.impi {
            insert_str(options, "impi", impi);
        }
    }
}

fn insert_str(options: &mut StageOptions, key: &str, value: &str) {
    options.insert(key.to_string(), OptionValue::Str(value.to_string()));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["gmxforge"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_stage_order_is_fixed() {
        let cli = parse(&[]);
        let kinds: Vec<StageKind> = cli.stages().into_iter().map(|(kind, _)| kind).collect();
        assert_eq!(
            kinds,
            vec![
                StageKind::Development,
                StageKind::Application,
                StageKind::Deployment
            ]
        );
    }

    #[test]
    fn test_default_base_distribution_and_engine() {
        let cli = parse(&[]);
        let stages = cli.stages();
        let (_, application) = &stages[1];
        assert_eq!(
            application.get("ubuntu"),
            Some(&OptionValue::Str(DEFAULT_UBUNTU.to_string()))
        );
        assert_eq!(
            application.get("engines"),
            Some(&OptionValue::List(vec![DEFAULT_ENGINE.to_string()]))
        );
    }

    #[test]
    fn test_mpi_and_fftw_reach_both_build_stages() {
        let cli = parse(&["--openmpi", "3.1.4", "--fftw", "3.3.7"]);
        let stages = cli.stages();
        let (_, development) = &stages[0];
        let (_, application) = &stages[1];
        assert!(development.contains_key("openmpi"));
        assert!(development.contains_key("fftw"));
        assert!(application.contains_key("openmpi"));
        assert!(application.contains_key("fftw"));
        let (_, deployment) = &stages[2];
        assert!(!deployment.contains_key("openmpi"));
    }

    #[test]
    fn test_ubuntu_and_centos_are_exclusive() {
        let result = Cli::try_parse_from(["gmxforge", "--ubuntu", "18.04", "--centos", "7"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_openmpi_and_impi_are_exclusive() {
        let result =
            Cli::try_parse_from(["gmxforge", "--openmpi", "3.1.4", "--impi", "2019.6"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_toggles_propagate() {
        let cli = parse(&["--double", "--regtest", "--format", "singularity"]);
        let stages = cli.stages();
        for (_, options) in &stages {
            assert_eq!(
                options.get("format"),
                Some(&OptionValue::Str("singularity".to_string()))
            );
            assert_eq!(options.get("double"), Some(&OptionValue::Bool(true)));
        }
        let (_, application) = &stages[1];
        assert_eq!(application.get("regtest"), Some(&OptionValue::Bool(true)));
    }

    #[test]
    fn test_repeated_engines_preserved_in_order() {
        let cli = parse(&["--engines", "simd=sse2", "--engines", "simd=avx2:rdtscp=on"]);
        let stages = cli.stages();
        let (_, application) = &stages[1];
        assert_eq!(
            application.get("engines"),
            Some(&OptionValue::List(vec![
                "simd=sse2".to_string(),
                "simd=avx2:rdtscp=on".to_string()
            ]))
        );
    }
}
