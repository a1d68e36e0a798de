// src/config.rs

//! Build configuration for recipe generation
//!
//! All tunable constants live in an immutable [`BuildConfig`] value that is
//! passed explicitly into the version gate, the option normalizer and the
//! template machinery. Nothing in this crate reads module-level globals.

use std::collections::BTreeMap;

/// Per-dimension filename fragments used to compose wrapper and binary
/// suffixes for a GROMACS build variant
#[derive(Debug, Clone)]
pub struct SuffixTokens {
    /// Appended when the build is MPI-aware
    pub mpi: String,
    /// Appended when double precision is enabled
    pub double: String,
    /// Appended when the RDTSCP hardware counter is enabled
    pub rdtscp: String,
}

impl SuffixTokens {
    /// Suffix of the `gmx` wrapper binary: `{mpi}{double}`
    pub fn wrapper_suffix(&self, mpi: bool, double: bool) -> String {
        let mut suffix = String::new();
        if mpi {
            suffix.push_str(&self.mpi);
        }
        if double {
            suffix.push_str(&self.double);
        }
        suffix
    }

    /// Suffix of per-engine binaries and libraries: `{mpi}{double}{rdtscp}`
    pub fn binary_suffix(&self, mpi: bool, double: bool, rdtscp: bool) -> String {
        let mut suffix = self.wrapper_suffix(mpi, double);
        if rdtscp {
            suffix.push_str(&self.rdtscp);
        }
        suffix
    }
}

/// Immutable configuration for one pipeline run
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Minimum required version per version-gated tool
    pub min_versions: BTreeMap<String, String>,
    /// User-facing SIMD name to GROMACS build vocabulary
    pub simd_table: BTreeMap<String, String>,
    /// Fragments composing wrapper and binary/library suffixes
    pub suffix_tokens: SuffixTokens,
    /// GROMACS installation directory inside the image
    pub install_prefix: String,
    /// Source tarball URL with a `$version$` placeholder
    pub source_url_template: String,
    /// Wrapper helper script in the build context
    pub wrapper_script: String,
    /// Engine chooser script in the build context
    pub chooser_script: String,
    /// Configuration file consumed by the chooser script
    pub chooser_config: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        let min_versions = BTreeMap::from([
            ("cmake".to_string(), "3.9.6".to_string()),
            ("openmpi".to_string(), "3.0.0".to_string()),
        ]);

        let simd_table = BTreeMap::from([
            ("sse2".to_string(), "SSE2".to_string()),
            ("avx".to_string(), "AVX_256".to_string()),
            ("avx2".to_string(), "AVX2_256".to_string()),
            ("avx_512f".to_string(), "AVX_512".to_string()),
        ]);

        Self {
            min_versions,
            simd_table,
            suffix_tokens: SuffixTokens {
                mpi: "_mpi".to_string(),
                double: "_d".to_string(),
                rdtscp: "_rdtscp".to_string(),
            },
            install_prefix: "/gromacs".to_string(),
            source_url_template: "ftp://ftp.gromacs.org/pub/gromacs/gromacs-$version$.tar.gz"
                .to_string(),
            wrapper_script: "/scripts/wrapper.py".to_string(),
            chooser_script: "/scripts/gmx_chooser.py".to_string(),
            chooser_config: "config.py".to_string(),
        }
    }
}

impl BuildConfig {
    /// Minimum required version for a gated tool, if one is configured
    pub fn min_version(&self, tool: &str) -> Option<&str> {
        self.min_versions.get(tool).map(String::as_str)
    }

    /// Source tarball URL for a GROMACS version
    pub fn source_url(&self, version: &str) -> String {
        self.source_url_template.replace("$version$", version)
    }

    /// Directory holding the wrapper and chooser scripts in the final image
    pub fn scripts_directory(&self) -> String {
        format!("{}/scripts", self.install_prefix)
    }
}
