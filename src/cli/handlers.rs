//! Command handlers. Each returns the process exit code.

use super::commands::{override_tokens, DetectArgs, DockerfileArgs, RunArgs};
use super::output::OutputFormatter;
use crate::aws::{AwsCli, AwsContext};
use crate::config::McpdockConfig;
use crate::deploy::AwsCliEngine;
use crate::detection::{self, Detection, ProxyOptions};
use crate::fs::RealFileSystem;
use crate::image::{dockerfile, DockerBuilder, EcrRegistry, ImageSpecBuilder, TagGenerator};
use crate::pipeline::{Pipeline, PipelineContext, PipelineError};
use crate::repository::{GithubRepositoryHost, RepositorySnapshot, NO_COMMIT};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

pub async fn handle_run(args: &RunArgs) -> i32 {
    let config = match McpdockConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => return report_failure(e.reason(), &e),
    };
    if let Err(e) = config.validate() {
        return report_failure(e.reason(), &e);
    }
    debug!("Loaded configuration:\n{}", config);

    let context = match build_context(&config) {
        Ok(context) => context,
        Err(e) => return report_failure(e.reason(), &e),
    };

    let outcome = match Pipeline::new(context).run(&config).await {
        Ok(outcome) => outcome,
        Err(e) => return report_failure(e.reason(), &e),
    };

    print_result(OutputFormatter::new(args.format.into()).format_outcome(&outcome))
}

fn build_context(config: &McpdockConfig) -> Result<PipelineContext, PipelineError> {
    let host = GithubRepositoryHost::new()?;
    let builder = DockerBuilder::connect()?;
    let build_region = config.build.aws_region.as_deref();

    let mut context = PipelineContext::new(Arc::new(host), Arc::new(builder));

    if config.build.push_to_ecr {
        let cli = AwsCli::new(AwsContext::resolve(build_region));
        context = context.with_registry(Arc::new(EcrRegistry::new(cli)));
    }

    if let Some(deploy) = config.deploy_enabled() {
        let region = deploy.aws_region.as_deref().or(build_region);
        let aws = AwsContext::resolve(region);
        info!(region = %aws.region(), "Deploying with AWS region");
        context = context.with_engine(Arc::new(AwsCliEngine::new(AwsCli::new(aws))));
    }

    Ok(context)
}

pub async fn handle_detect(args: &DetectArgs) -> i32 {
    let snapshot = match load_local(args.repository_path.as_deref()) {
        Ok(snapshot) => snapshot,
        Err(code) => return code,
    };

    let options = ProxyOptions::new(args.port, args.proxy_debug);
    let detection = match detect_local(&snapshot, &args.command_override, options) {
        Ok(detection) => detection,
        Err(code) => return code,
    };

    print_result(OutputFormatter::new(args.format.into()).format_detection(&detection))
}

pub async fn handle_dockerfile(args: &DockerfileArgs) -> i32 {
    let snapshot = match load_local(args.repository_path.as_deref()) {
        Ok(snapshot) => snapshot,
        Err(code) => return code,
    };

    let options = ProxyOptions::new(args.port, args.proxy_debug);
    let detection = match detect_local(&snapshot, &args.command_override, options) {
        Ok(detection) => detection,
        Err(code) => return code,
    };

    let (sha, ref_name) = match snapshot.revision() {
        Some(revision) => (revision.commit_sha.as_str(), revision.ref_name.as_deref()),
        None => (NO_COMMIT, None),
    };
    let tag = TagGenerator::default().generate(sha, ref_name);

    let spec = match ImageSpecBuilder::new(detection.resolution)
        .environment_variables(args.env.iter().cloned())
        .build(tag)
    {
        Ok(spec) => spec,
        Err(e) => return report_failure(e.reason(), &e),
    };
    let rendered = dockerfile::render(&spec);

    match &args.output {
        Some(path) => match std::fs::write(path, &rendered) {
            Ok(()) => {
                info!(path = %path.display(), "Wrote Dockerfile");
                0
            }
            Err(e) => {
                error!("Failed to write {}: {}", path.display(), e);
                1
            }
        },
        None => {
            print!("{}", rendered);
            0
        }
    }
}

fn load_local(path: Option<&Path>) -> Result<RepositorySnapshot, i32> {
    let repo_path: PathBuf = match path {
        Some(path) => path.to_path_buf(),
        None => env::current_dir().map_err(|e| {
            error!("Failed to get current directory: {}", e);
            1
        })?,
    };
    debug!("Repository path: {}", repo_path.display());

    if !repo_path.is_dir() {
        error!(
            "Repository path is not a directory: {}",
            repo_path.display()
        );
        return Err(1);
    }

    let repo_path = repo_path.canonicalize().map_err(|e| {
        error!("Failed to canonicalize repository path: {}", e);
        1
    })?;

    RepositorySnapshot::load(&RealFileSystem, &repo_path).map_err(|e| {
        error!("Failed to read repository: {:#}", e);
        1
    })
}

fn detect_local(
    snapshot: &RepositorySnapshot,
    command_override: &[String],
    options: ProxyOptions,
) -> Result<Detection, i32> {
    detection::detect(snapshot, override_tokens(command_override), options)
        .map_err(|e| report_failure(e.reason(), &e))
}

fn print_result(formatted: anyhow::Result<String>) -> i32 {
    match formatted {
        Ok(text) => {
            println!("{}", text);
            0
        }
        Err(e) => {
            error!("Failed to format output: {:#}", e);
            1
        }
    }
}

fn report_failure(reason: &str, err: &dyn std::fmt::Display) -> i32 {
    error!(reason, "{}", err);
    eprintln!("error[{}]: {}", reason, err);
    1
}
