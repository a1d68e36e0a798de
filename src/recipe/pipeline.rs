// src/recipe/pipeline.rs

//! Pipeline driver: fixed-order stage construction and recipe emission
//!
//! Stages are built strictly in order; each constructor requires the fully
//! completed predecessor's handoff, so no stage begins before the previous
//! one is done. Each cooked stage is flushed to the output stream as soon
//! as it completes. A failing stage aborts the whole pipeline; output
//! already flushed for earlier stages is not retracted.

use crate::config::BuildConfig;
use crate::error::Result;
use std::io::Write;
use tracing::info;

use super::application::ApplicationStage;
use super::deployment::DeploymentStage;
use super::development::DevelopmentStage;
use super::options::StageOptions;
use super::stage::{StageHandoff, StageKind, StageRecipe};

pub struct Pipeline {
    config: BuildConfig,
}

impl Pipeline {
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    /// Build every requested stage in order and emit the recipe document
    ///
    /// `stages` arrives in fixed pipeline order (development, application,
    /// deployment); stages the caller did not request are simply absent.
    pub fn run<W: Write>(
        &self,
        stages: Vec<(StageKind, StageOptions)>,
        output: &mut W,
    ) -> Result<()> {
        let mut previous: Option<StageHandoff> = None;
        for (kind, options) in stages {
            info!(stage = %kind, "building stage");
            let handoff = match kind {
                StageKind::Development => self.cook(
                    DevelopmentStage::build(options, previous.as_ref(), &self.config)?,
                    output,
                )?,
                StageKind::Application => self.cook(
                    ApplicationStage::build(options, previous.as_ref(), &self.config)?,
                    output,
                )?,
                StageKind::Deployment => self.cook(
                    DeploymentStage::build(options, previous.as_ref(), &self.config)?,
                    output,
                )?,
            };
            previous = Some(handoff);
        }
        Ok(())
    }

    /// Serialize a completed stage and publish its handoff
    fn cook<S: StageRecipe, W: Write>(&self, stage: S, output: &mut W) -> Result<StageHandoff> {
        write!(output, "{}", stage.container().render(stage.format()))?;
        output.flush()?;
        Ok(stage.handoff())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::recipe::options::OptionValue;

    fn option(value: &str) -> OptionValue {
        OptionValue::Str(value.to_string())
    }

    fn dev_options() -> StageOptions {
        StageOptions::from([
            ("ubuntu".to_string(), option("18.04")),
            ("gcc".to_string(), option("9")),
        ])
    }

    fn app_options() -> StageOptions {
        StageOptions::from([
            ("ubuntu".to_string(), option("18.04")),
            ("gcc".to_string(), option("9")),
            ("gromacs".to_string(), option("2020")),
            (
                "engines".to_string(),
                OptionValue::List(vec!["simd=sse2".to_string()]),
            ),
        ])
    }

    #[test]
    fn test_stages_emitted_in_construction_order() {
        let pipeline = Pipeline::new(BuildConfig::default());
        let mut output = Vec::new();
        pipeline
            .run(
                vec![
                    (StageKind::Development, dev_options()),
                    (StageKind::Application, app_options()),
                    (StageKind::Deployment, StageOptions::from([(
                        "ubuntu".to_string(),
                        option("18.04"),
                    )])),
                ],
                &mut output,
            )
            .unwrap();

        let recipe = String::from_utf8(output).unwrap();
        let dev = recipe.find("AS dev_stage").unwrap();
        let app = recipe.find("AS app_stage").unwrap();
        let deploy = recipe.find("AS deploy_stage").unwrap();
        assert!(dev < app && app < deploy);
    }

    #[test]
    fn test_failed_stage_emits_nothing() {
        let pipeline = Pipeline::new(BuildConfig::default());
        let mut options = dev_options();
        options.insert("impi".to_string(), option("2019.6"));

        let mut output = Vec::new();
        let err = pipeline
            .run(vec![(StageKind::Development, options)], &mut output)
            .unwrap_err();
        assert!(matches!(err, Error::Unimplemented(_)));
        assert!(output.is_empty());
    }

    #[test]
    fn test_earlier_stage_output_not_retracted() {
        let pipeline = Pipeline::new(BuildConfig::default());
        // The deployment stage fails (no wrapper was published), after the
        // development stage already flushed.
        let mut output = Vec::new();
        let result = pipeline.run(
            vec![
                (StageKind::Development, dev_options()),
                (StageKind::Deployment, StageOptions::from([(
                    "ubuntu".to_string(),
                    option("18.04"),
                )])),
            ],
            &mut output,
        );
        assert!(result.is_err());
        let recipe = String::from_utf8(output).unwrap();
        assert!(recipe.contains("AS dev_stage"));
    }
}
