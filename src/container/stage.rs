// src/container/stage.rs

//! Accumulating instruction container for one build stage

use super::instruction::Instruction;
use super::ContainerFormat;

/// Ordered, append-only instruction list for a single stage
///
/// Instruction order is significant and preserved exactly as appended:
/// later instructions execute after earlier ones in the emitted recipe.
#[derive(Debug, Clone)]
pub struct ContainerStage {
    name: String,
    instructions: Vec<Instruction>,
}

impl ContainerStage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: Vec::new(),
        }
    }

    /// Stage alias used in base-image and cross-stage copy instructions
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    pub fn extend(&mut self, instructions: impl IntoIterator<Item = Instruction>) {
        self.instructions.extend(instructions);
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Whether a base-image instruction has been appended
    pub fn has_base_image(&self) -> bool {
        self.instructions
            .iter()
            .any(|instruction| matches!(instruction, Instruction::BaseImage { .. }))
    }

    /// Runtime instructions the next stage appends after its base image
    ///
    /// Collects the runtime form of every appended instruction, resolves
    /// cross-stage copies to this stage's name, and drops exact duplicates
    /// (several build variants share one installation prefix).
    pub fn runtime(&self) -> Vec<Instruction> {
        let mut runtime: Vec<Instruction> = Vec::new();
        for instruction in &self.instructions {
            for entry in instruction.runtime() {
                let entry = match entry {
                    Instruction::Copy {
                        from: None,
                        src,
                        dest,
                    } => Instruction::Copy {
                        from: Some(self.name.clone()),
                        src,
                        dest,
                    },
                    other => other,
                };
                if !runtime.contains(&entry) {
                    runtime.push(entry);
                }
            }
        }
        runtime
    }

    /// Serialize the stage's instructions in append order
    pub fn render(&self, format: ContainerFormat) -> String {
        let mut rendered: Vec<String> = self
            .instructions
            .iter()
            .map(|instruction| instruction.render(format))
            .collect();
        rendered.push(String::new());
        rendered.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{GenericCmakeBuild, GnuToolchain, Instruction};

    fn base_image() -> Instruction {
        Instruction::BaseImage {
            image: "ubuntu:18.04".to_string(),
            stage_name: "dev_stage".to_string(),
        }
    }

    #[test]
    fn test_order_preserved() {
        let mut stage = ContainerStage::new("dev_stage");
        stage.push(base_image());
        stage.push(Instruction::Shell {
            commands: vec!["echo one".to_string()],
        });
        stage.push(Instruction::Shell {
            commands: vec!["echo two".to_string()],
        });

        let rendered = stage.render(ContainerFormat::Docker);
        let from = rendered.find("FROM").unwrap();
        let one = rendered.find("echo one").unwrap();
        let two = rendered.find("echo two").unwrap();
        assert!(from < one && one < two);
    }

    #[test]
    fn test_has_base_image() {
        let mut stage = ContainerStage::new("dev_stage");
        assert!(!stage.has_base_image());
        stage.push(base_image());
        assert!(stage.has_base_image());
    }

    #[test]
    fn test_runtime_resolves_copy_source() {
        let mut stage = ContainerStage::new("app_stage");
        stage.push(Instruction::GenericBuild(GenericCmakeBuild {
            url: "http://example.org/app.tar.gz".to_string(),
            directory: "app".to_string(),
            build_directory: "build".to_string(),
            prefix: "/gromacs".to_string(),
            build_environment: vec![],
            cmake_opts: vec![],
            preconfigure: vec![],
            check: false,
        }));

        let runtime = stage.runtime();
        assert!(runtime.iter().any(|instruction| matches!(
            instruction,
            Instruction::Copy { from: Some(stage), src, .. }
                if stage == "app_stage" && src == "/gromacs"
        )));
    }

    #[test]
    fn test_runtime_deduplicates_shared_prefix() {
        let build = GenericCmakeBuild {
            url: "http://example.org/app.tar.gz".to_string(),
            directory: "app".to_string(),
            build_directory: "build.SSE2".to_string(),
            prefix: "/gromacs".to_string(),
            build_environment: vec![],
            cmake_opts: vec![],
            preconfigure: vec![],
            check: false,
        };
        let mut variant = build.clone();
        variant.build_directory = "build.AVX2_256".to_string();

        let mut stage = ContainerStage::new("app_stage");
        stage.push(Instruction::GenericBuild(build));
        stage.push(Instruction::GenericBuild(variant));

        let copies = stage
            .runtime()
            .iter()
            .filter(|instruction| matches!(instruction, Instruction::Copy { .. }))
            .count();
        assert_eq!(copies, 1);
    }

    #[test]
    fn test_runtime_of_compiler_is_package_install() {
        let mut stage = ContainerStage::new("dev_stage");
        stage.push(Instruction::Compiler(GnuToolchain::new("9")));
        let runtime = stage.runtime();
        assert!(runtime.iter().any(|instruction| matches!(
            instruction,
            Instruction::Packages { packages } if packages.contains(&"libgomp1".to_string())
        )));
    }
}
