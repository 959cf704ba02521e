//! Runs one build-and-deploy invocation end to end
//!
//! Steps run strictly in order and each one only starts after the previous
//! one succeeded. Detection failures abort before any image is built, and
//! deployment takes a [`PushedImage`] so it cannot start without one.

use super::context::PipelineContext;
use super::error::PipelineError;
use crate::client_config::{ClientConfig, ClientConfigEmitter};
use crate::config::{DeployConfig, McpdockConfig};
use crate::deploy::{template, DeploymentResult, StackOrchestrator};
use crate::detection::{self, Detection};
use crate::image::{
    dockerfile, BuiltImage, ImageReference, ImageSpec, ImageSpecBuilder, PushedImage,
    TagGenerator,
};
use crate::repository::{FetchRequest, FetchedRepository, NO_COMMIT};
use serde::Serialize;
use std::fmt;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    Fetch,
    Detect,
    ImageSpec,
    Build,
    Push,
    Deploy,
    ClientConfig,
}

impl PipelineStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Detect => "detect",
            Self::ImageSpec => "image-spec",
            Self::Build => "build",
            Self::Push => "push",
            Self::Deploy => "deploy",
            Self::ClientConfig => "client-config",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub detection: Detection,
    pub image: ImageReference,
    pub pushed: bool,
    pub deployment: Option<DeploymentResult>,
    pub client_config: Option<ClientConfig>,
}

pub struct Pipeline {
    context: PipelineContext,
}

impl Pipeline {
    pub fn new(context: PipelineContext) -> Self {
        Self { context }
    }

    pub async fn run(&self, config: &McpdockConfig) -> Result<PipelineOutcome, PipelineError> {
        let start = Instant::now();
        config.validate()?;
        let build = &config.build;
        info!(repository = %build.github_url, "Starting pipeline");

        step(PipelineStep::Fetch);
        let request = FetchRequest::new(&build.github_url)
            .with_branch(build.branch.clone())
            .with_subfolder(build.subfolder.clone());
        let fetched = self.context.repository_host.fetch(&request).await?;

        step(PipelineStep::Detect);
        let detection = detection::detect(
            fetched.snapshot(),
            build.command_override.as_deref(),
            build.proxy_options(),
        )?;

        step(PipelineStep::ImageSpec);
        let spec = self.image_spec(&fetched, &detection, config)?;
        let dockerfile = match &build.dockerfile_path {
            Some(path) => {
                info!(path = %path.display(), "Using custom Dockerfile");
                dockerfile::load_custom(path)?
            }
            None => dockerfile::render(&spec),
        };
        debug!(proxy_command = %spec.entrypoint_proxy_command(), "Image spec ready");

        let image = self.image_reference(config, &spec).await?;

        step(PipelineStep::Build);
        let built = self
            .context
            .builder
            .build(fetched.source_dir(), &dockerfile, &image)
            .await?;

        let pushed = if build.push_to_ecr {
            step(PipelineStep::Push);
            Some(self.push(&built).await?)
        } else {
            None
        };

        let mut deployment = None;
        let mut client_config = None;
        if let (Some(deploy), Some(pushed)) = (config.deploy_enabled(), pushed.as_ref()) {
            step(PipelineStep::Deploy);
            let result = self.deploy(deploy, pushed).await?;

            step(PipelineStep::ClientConfig);
            let emitted = self.client_config(deploy, &result)?;
            deployment = Some(result);
            client_config = Some(emitted);
        }

        info!(
            image = %image,
            elapsed_secs = start.elapsed().as_secs(),
            "Pipeline complete"
        );

        Ok(PipelineOutcome {
            detection,
            image,
            pushed: pushed.is_some(),
            deployment,
            client_config,
        })
    }

    fn image_spec(
        &self,
        fetched: &FetchedRepository,
        detection: &Detection,
        config: &McpdockConfig,
    ) -> Result<ImageSpec, PipelineError> {
        let (sha, ref_name) = match fetched.snapshot().revision() {
            Some(revision) => (revision.commit_sha.as_str(), revision.ref_name.as_deref()),
            None => (NO_COMMIT, config.build.branch.as_deref()),
        };
        let tag = TagGenerator::new(self.context.clock.clone()).generate(sha, ref_name);

        Ok(ImageSpecBuilder::new(detection.resolution.clone())
            .environment_variables(config.build.environment_variables.clone())
            .build(tag)?)
    }

    async fn image_reference(
        &self,
        config: &McpdockConfig,
        spec: &ImageSpec,
    ) -> Result<ImageReference, PipelineError> {
        let name = config.build.image_name();
        if !config.build.push_to_ecr {
            return Ok(ImageReference::local(name, spec.tag.clone()));
        }

        let registry = match &config.build.ecr_repository {
            Some(repository) => repository.clone(),
            None => self.registry()?.default_registry().await?,
        };
        Ok(ImageReference::new(registry, name, spec.tag.clone()))
    }

    fn registry(&self) -> Result<&dyn crate::image::ImageRegistry, PipelineError> {
        self.context
            .registry
            .as_deref()
            .ok_or(PipelineError::MissingCollaborator("image registry"))
    }

    async fn push(&self, built: &BuiltImage) -> Result<PushedImage, PipelineError> {
        let credentials = self.registry()?.prepare(&built.reference).await?;
        Ok(self
            .context
            .builder
            .push(&built.reference, &credentials)
            .await?)
    }

    async fn deploy(
        &self,
        deploy: &DeployConfig,
        pushed: &PushedImage,
    ) -> Result<DeploymentResult, PipelineError> {
        let engine = self
            .context
            .engine
            .clone()
            .ok_or(PipelineError::MissingCollaborator("infrastructure engine"))?;

        let params = deploy.to_parameters()?;
        let raw_template = template::load(deploy.template_path.as_deref())?;
        let rendered = template::render(&raw_template, &params.template_values(&pushed.uri()))?;

        let orchestrator = StackOrchestrator::with_settings(engine, deploy.orchestrator_settings());
        Ok(orchestrator
            .apply(&params.stack_name(), &rendered, &params.to_parameter_map())
            .await?)
    }

    fn client_config(
        &self,
        deploy: &DeployConfig,
        result: &DeploymentResult,
    ) -> Result<ClientConfig, PipelineError> {
        let params = deploy.to_parameters()?;
        let config = ClientConfigEmitter::new(&params.service_name)
            .with_description(deploy.description.clone())
            .with_certificate(params.has_certificate())
            .emit(result, deploy.transport)?;

        if let Some(path) = &deploy.save_config {
            config.save(path).map_err(|e| PipelineError::Output {
                path: path.clone(),
                message: e.to_string(),
            })?;
        }
        Ok(config)
    }
}

fn step(step: PipelineStep) {
    info!(step = %step, "Pipeline step");
}
