// src/recipe/deployment.rs

//! Deployment stage: the minimal runtime image
//!
//! Starts from a clean base image, pulls in the application stage's runtime
//! artifacts, installs the interpreter the helper scripts need and wires
//! the wrapper/chooser scripts onto the search path. No version gating, no
//! engine enumeration.

use crate::config::BuildConfig;
use crate::container::{ContainerFormat, ContainerStage, Instruction, PythonInstall};
use crate::error::{Error, Result};

use super::options::{normalize, OptionValue, StageOptions};
use super::stage::{require_str, run_dispatch, StageCore, StageHandoff, StageKind, StageRecipe};

/// OS packages installed into the runtime image
const OS_PACKAGES: [&str; 1] = ["vim"];

#[derive(Debug)]
pub struct DeploymentStage<'a> {
    core: StageCore<'a>,
    /// Wrapper binary name published by the application stage
    wrapper: Option<String>,
}

impl<'a> DeploymentStage<'a> {
    const HANDLER_KEYS: &'static [&'static str] = &["format", "ubuntu", "centos", "cuda"];

    /// Construct the stage: normalize, dispatch, ready to cook
    pub fn build(
        options: StageOptions,
        previous: Option<&StageHandoff>,
        config: &'a BuildConfig,
    ) -> Result<Self> {
        let (flags, residual) = normalize(StageKind::Deployment, options);
        let wrapper = previous.and_then(|handoff| handoff.wrapper.clone());
        let mut stage = Self {
            core: StageCore::new(StageKind::Deployment, config, flags, previous),
            wrapper,
        };
        run_dispatch(&mut stage, &residual)?;
        Ok(stage)
    }

    /// Scripts directory setup, run after the base image is in place
    fn configure(&mut self) -> Result<()> {
        let config = self.core.config;
        let scripts_directory = config.scripts_directory();
        let wrapper = self.wrapper.clone().ok_or_else(|| {
            Error::Implementation(
                "deployment requires the wrapper name published by the application stage"
                    .to_string(),
            )
        })?;

        self.core.container.push(Instruction::Python(PythonInstall::new()));
        self.core.container.push(Instruction::Packages {
            packages: OS_PACKAGES.iter().map(|package| package.to_string()).collect(),
        });
        self.core.container.push(Instruction::Shell {
            commands: vec![format!("mkdir -p {scripts_directory}")],
        });
        self.core.container.push(Instruction::Copy {
            from: None,
            src: config.wrapper_script.clone(),
            dest: format!("{scripts_directory}/{wrapper}"),
        });
        self.core.container.push(Instruction::Copy {
            from: None,
            src: config.chooser_script.clone(),
            dest: format!("{scripts_directory}/{}", basename(&config.chooser_script)),
        });
        self.core.container.push(Instruction::Shell {
            commands: vec![format!("chmod +x {scripts_directory}/*")],
        });
        self.core.container.push(Instruction::Copy {
            from: None,
            src: config.chooser_config.clone(),
            dest: format!("{scripts_directory}/{}", basename(&config.chooser_config)),
        });
        self.core.container.push(Instruction::Environment {
            variables: vec![("PATH".to_string(), format!("$PATH:{scripts_directory}"))],
        });
        Ok(())
    }
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

impl StageRecipe for DeploymentStage<'_> {
    fn kind(&self) -> StageKind {
        StageKind::Deployment
    }

    fn handler_keys(&self) -> &'static [&'static str] {
        Self::HANDLER_KEYS
    }

    fn dispatch(&mut self, key: &str, value: &OptionValue) -> Result<()> {
        match key {
            "format" => self.core.set_format(value),
            "ubuntu" => {
                self.core.ubuntu(require_str(key, value)?)?;
                self.configure()
            }
            "centos" => {
                self.core.centos(require_str(key, value)?)?;
                self.configure()
            }
            "cuda" => self.core.cuda(),
            _ => Err(Error::Implementation(format!(
                "deployment stage has no handler for option '{key}'"
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
        handoff.wrapper = self.wrapper.clone();
        handoff
    }
}
