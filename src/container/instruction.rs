// src/container/instruction.rs

//! The recipe instruction vocabulary and its serialization
//!
//! Primitive instructions render directly; building-block instructions
//! lower themselves to primitives first. Rendering is purely mechanical:
//! order and content are decided entirely by the stage builders.

use super::blocks::{
    CmakeInstall, FftwInstall, GenericCmakeBuild, GnuToolchain, OpenMpiInstall, PythonInstall,
};
use super::ContainerFormat;

/// One recipe instruction appended to a stage
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Free-form comment line(s)
    Comment(String),
    /// Base image selection, aliased with the stage name
    BaseImage { image: String, stage_name: String },
    /// OS package installation
    Packages { packages: Vec<String> },
    /// Shell command sequence
    Shell { commands: Vec<String> },
    /// File copy, from the build context or from an earlier stage
    Copy {
        from: Option<String>,
        src: String,
        dest: String,
    },
    /// Environment variables, in append order
    Environment { variables: Vec<(String, String)> },
    /// GNU compiler toolchain building block
    Compiler(GnuToolchain),
    /// CMake binary installer building block
    Cmake(CmakeInstall),
    /// OpenMPI build-from-source building block
    OpenMpi(OpenMpiInstall),
    /// FFTW build-from-source building block
    Fftw(FftwInstall),
    /// Python interpreter building block
    Python(PythonInstall),
    /// Generic fetch-configure-build-install cmake project
    GenericBuild(GenericCmakeBuild),
}

impl Instruction {
    /// Lower a building block to primitives; `None` for primitives
    fn lower(&self) -> Option<Vec<Instruction>> {
        match self {
            Instruction::Compiler(block) => Some(block.lower()),
            Instruction::Cmake(block) => Some(block.lower()),
            Instruction::OpenMpi(block) => Some(block.lower()),
            Instruction::Fftw(block) => Some(block.lower()),
            Instruction::Python(block) => Some(block.lower()),
            Instruction::GenericBuild(block) => Some(block.lower()),
            _ => None,
        }
    }

    /// Runtime-stage instructions contributed by this instruction
    ///
    /// Empty for primitives. `Copy` entries with no `from` are resolved to
    /// the producing stage by [`super::ContainerStage::runtime`].
    pub(crate) fn runtime(&self) -> Vec<Instruction> {
        match self {
            Instruction::Compiler(block) => block.runtime(),
            Instruction::OpenMpi(block) => block.runtime(),
            Instruction::Fftw(block) => block.runtime(),
            Instruction::Python(block) => block.runtime(),
            Instruction::GenericBuild(block) => block.runtime(),
            _ => Vec::new(),
        }
    }

    /// Serialize to the requested recipe format
    pub fn render(&self, format: ContainerFormat) -> String {
        if let Some(lowered) = self.lower() {
            return lowered
                .iter()
                .map(|instruction| instruction.render(format))
                .collect::<Vec<_>>()
                .join("\n");
        }
        match format {
            ContainerFormat::Docker => self.render_docker(),
            ContainerFormat::Singularity => self.render_singularity(),
        }
    }

    fn render_docker(&self) -> String {
        match self {
            Instruction::Comment(text) => format!("# {text}"),
            Instruction::BaseImage { image, stage_name } => {
                format!("FROM {image} AS {stage_name}")
            }
            Instruction::Packages { packages } => format!(
                "RUN apt-get update -y && \\\n    \
                 apt-get install -y --no-install-recommends \\\n        {} && \\\n    \
                 rm -rf /var/lib/apt/lists/*",
                packages.join(" ")
            ),
            Instruction::Shell { commands } => {
                format!("RUN {}", commands.join(" && \\\n    "))
            }
            Instruction::Copy { from, src, dest } => match from {
                Some(stage) => format!("COPY --from={stage} {src} {dest}"),
                None => format!("COPY {src} {dest}"),
            },
            Instruction::Environment { variables } => {
                let pairs: Vec<String> = variables
                    .iter()
                    .map(|(key, value)| format!("{key}={value}"))
                    .collect();
                format!("ENV {}", pairs.join(" \\\n    "))
            }
            _ => unreachable!("building blocks are lowered before rendering"),
        }
    }

    fn render_singularity(&self) -> String {
        match self {
            Instruction::Comment(text) => format!("# {text}"),
            Instruction::BaseImage { image, stage_name } => {
                format!("BootStrap: docker\nFrom: {image}\nStage: {stage_name}")
            }
            Instruction::Packages { packages } => format!(
                "%post\n    cd /\n    apt-get update -y\n    \
                 apt-get install -y --no-install-recommends \\\n        {}\n    \
                 rm -rf /var/lib/apt/lists/*",
                packages.join(" ")
            ),
            Instruction::Shell { commands } => {
                let mut lines = vec!["%post".to_string(), "    cd /".to_string()];
                lines.extend(commands.iter().map(|command| format!("    {command}")));
                lines.join("\n")
            }
            Instruction::Copy { from, src, dest } => match from {
                Some(stage) => format!("%files from {stage}\n    {src} {dest}"),
                None => format!("%files\n    {src} {dest}"),
            },
            Instruction::Environment { variables } => {
                let exports: Vec<String> = variables
                    .iter()
                    .map(|(key, value)| format!("    export {key}={value}"))
                    .collect();
                format!(
                    "%environment\n{}\n%post\n{}",
                    exports.join("\n"),
                    exports.join("\n")
                )
            }
            _ => unreachable!("building blocks are lowered before rendering"),
        }
    }
}
