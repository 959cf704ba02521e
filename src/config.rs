//! Build and deploy settings for a single run
//!
//! Settings are read from one YAML file with a required `build` section and
//! an optional `deploy` section:
//!
//! ```yaml
//! build:
//!   github_url: https://github.com/org/weather-mcp
//!   subfolder: src/weather
//!   push_to_ecr: true
//!   command_override: ["python", "-m", "weather"]
//!   environment_variables:
//!     API_BASE: https://api.example.com
//! deploy:
//!   enabled: true
//!   service_name: weather
//!   cluster_name: mcp-cluster
//!   vpc_id: vpc-0123
//!   alb_subnet_ids: subnet-a, subnet-b
//!   ecs_subnet_ids: [subnet-c]
//! ```
//!
//! Subnet fields take either a YAML list or a comma-separated string. The
//! legacy `subnet_ids` field fills whichever of the two specific lists is
//! missing.

use crate::client_config::TransportKind;
use crate::deploy::{DeployParameters, OrchestratorSettings};
use crate::detection::{ProxyOptions, DEFAULT_PROXY_PORT};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_CPU: u32 = 256;
const DEFAULT_MEMORY: u32 = 512;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
const DEFAULT_TIMEOUT_SECS: u64 = 3600;
const MIN_ALB_SUBNETS: usize = 2;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {message}")]
    Unreadable { path: PathBuf, message: String },

    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },

    #[error("failed to parse image URI '{0}': expected <registry>/<name>[:tag]")]
    InvalidImageUri(String),
}

impl ConfigError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Unreadable { .. } => "config-unreadable",
            Self::Parse(_) => "config-parse",
            Self::Missing(_) => "missing-setting",
            Self::Invalid { .. } => "invalid-setting",
            Self::InvalidImageUri(_) => "invalid-image-uri",
        }
    }

    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct McpdockConfig {
    pub build: BuildConfig,
    #[serde(default)]
    pub deploy: Option<DeployConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
    pub github_url: String,
    #[serde(default)]
    pub image_name: Option<String>,
    #[serde(default)]
    pub image_uri: Option<String>,
    #[serde(default)]
    pub ecr_repository: Option<String>,
    #[serde(default)]
    pub subfolder: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub aws_region: Option<String>,
    #[serde(default)]
    pub dockerfile_path: Option<PathBuf>,
    #[serde(default)]
    pub push_to_ecr: bool,
    #[serde(default)]
    pub command_override: Option<Vec<String>>,
    #[serde(default)]
    pub environment_variables: BTreeMap<String, String>,
    #[serde(default = "default_proxy_port")]
    pub proxy_port: u16,
    #[serde(default)]
    pub proxy_debug: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeployConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub cluster_name: Option<String>,
    #[serde(default)]
    pub vpc_id: Option<String>,
    #[serde(default, deserialize_with = "subnet_list")]
    pub alb_subnet_ids: Vec<String>,
    #[serde(default, deserialize_with = "subnet_list")]
    pub ecs_subnet_ids: Vec<String>,
    /// Older single list used for both the load balancer and the tasks
    #[serde(default, deserialize_with = "subnet_list")]
    pub subnet_ids: Vec<String>,
    #[serde(default)]
    pub aws_region: Option<String>,
    #[serde(default = "default_proxy_port")]
    pub port: u16,
    #[serde(default = "default_cpu")]
    pub cpu: u32,
    #[serde(default = "default_memory")]
    pub memory: u32,
    #[serde(default)]
    pub certificate_arn: Option<String>,
    #[serde(default)]
    pub save_config: Option<PathBuf>,
    #[serde(default)]
    pub template_path: Option<PathBuf>,
    #[serde(default)]
    pub transport: TransportKind,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_proxy_port() -> u16 {
    DEFAULT_PROXY_PORT
}

fn default_cpu() -> u32 {
    DEFAULT_CPU
}

fn default_memory() -> u32 {
    DEFAULT_MEMORY
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SubnetField {
    List(Vec<String>),
    Joined(String),
}

fn subnet_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let raw: Vec<String> = match Option::<SubnetField>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(SubnetField::List(list)) => list,
        Some(SubnetField::Joined(joined)) => joined.split(',').map(str::to_string).collect(),
    };
    Ok(raw
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

impl McpdockConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_yaml(&content)
    }

    /// Parses and normalises; does not validate
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yaml::from_str(content)?;
        config.normalize()?;
        Ok(config)
    }

    fn normalize(&mut self) -> Result<(), ConfigError> {
        let build = &mut self.build;
        if let Some(uri) = build.image_uri.as_deref() {
            let (repository, name) = split_image_uri(uri)?;
            build.ecr_repository = Some(repository);
            build.image_name = Some(name);
        } else if build.image_name.is_none() {
            build.image_name = Some(default_image_name(
                &build.github_url,
                build.subfolder.as_deref(),
            ));
        }

        if let Some(deploy) = self.deploy.as_mut() {
            if deploy.alb_subnet_ids.is_empty() {
                deploy.alb_subnet_ids = deploy.subnet_ids.clone();
            }
            if deploy.ecs_subnet_ids.is_empty() {
                deploy.ecs_subnet_ids = deploy.subnet_ids.clone();
            }
        }
        Ok(())
    }

    /// The deploy section, when present and enabled
    pub fn deploy_enabled(&self) -> Option<&DeployConfig> {
        self.deploy.as_ref().filter(|d| d.enabled)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let build = &self.build;
        if build.github_url.trim().is_empty() {
            return Err(ConfigError::Missing("build.github_url"));
        }
        if let Some(tokens) = &build.command_override {
            if tokens.iter().all(|t| t.trim().is_empty()) {
                return Err(ConfigError::invalid(
                    "build.command_override",
                    "must contain at least one argument",
                ));
            }
        }
        if build.proxy_port == 0 {
            return Err(ConfigError::invalid("build.proxy_port", "must be positive"));
        }

        let Some(deploy) = self.deploy_enabled() else {
            return Ok(());
        };

        if !build.push_to_ecr {
            return Err(ConfigError::invalid(
                "build.push_to_ecr",
                "deployment needs the image pushed; set push_to_ecr: true",
            ));
        }
        deploy.validate()
    }
}

impl BuildConfig {
    pub fn image_name(&self) -> String {
        self.image_name
            .clone()
            .unwrap_or_else(|| default_image_name(&self.github_url, self.subfolder.as_deref()))
    }

    pub fn proxy_options(&self) -> ProxyOptions {
        ProxyOptions::new(self.proxy_port, self.proxy_debug)
    }
}

impl DeployConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("deploy.service_name", &self.service_name),
            ("deploy.cluster_name", &self.cluster_name),
            ("deploy.vpc_id", &self.vpc_id),
        ] {
            if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
                return Err(ConfigError::Missing(field));
            }
        }

        if self.alb_subnet_ids.len() < MIN_ALB_SUBNETS {
            return Err(ConfigError::invalid(
                "deploy.alb_subnet_ids",
                format!(
                    "an application load balancer needs at least {} subnets, got {}",
                    MIN_ALB_SUBNETS,
                    self.alb_subnet_ids.len()
                ),
            ));
        }
        if self.ecs_subnet_ids.is_empty() {
            return Err(ConfigError::invalid(
                "deploy.ecs_subnet_ids",
                "at least one subnet is required",
            ));
        }
        if self.cpu == 0 {
            return Err(ConfigError::invalid("deploy.cpu", "must be positive"));
        }
        if self.memory == 0 {
            return Err(ConfigError::invalid("deploy.memory", "must be positive"));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::invalid(
                "deploy.poll_interval_secs",
                "must be at least 1",
            ));
        }
        if self.timeout_secs < self.poll_interval_secs {
            return Err(ConfigError::invalid(
                "deploy.timeout_secs",
                "must not be shorter than the poll interval",
            ));
        }
        Ok(())
    }

    pub fn to_parameters(&self) -> Result<DeployParameters, ConfigError> {
        Ok(DeployParameters {
            service_name: required(&self.service_name, "deploy.service_name")?,
            cluster_name: required(&self.cluster_name, "deploy.cluster_name")?,
            vpc_id: required(&self.vpc_id, "deploy.vpc_id")?,
            alb_subnet_ids: self.alb_subnet_ids.clone(),
            ecs_subnet_ids: self.ecs_subnet_ids.clone(),
            port: self.port,
            cpu: self.cpu,
            memory: self.memory,
            certificate_arn: self.certificate_arn.clone(),
        })
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            timeout: Duration::from_secs(self.timeout_secs),
            ..Default::default()
        }
    }
}

fn required(value: &Option<String>, field: &'static str) -> Result<String, ConfigError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ConfigError::Missing(field))
}

/// `<repo-name>[-<subfolder with slashes as dashes>]`
pub fn default_image_name(github_url: &str, subfolder: Option<&str>) -> String {
    let trimmed = github_url.trim().trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    let repo = trimmed.rsplit('/').next().unwrap_or(trimmed);

    match subfolder.map(|s| s.trim_matches('/')).filter(|s| !s.is_empty()) {
        Some(sub) => format!("{}-{}", repo, sub.replace('/', "-")),
        None => repo.to_string(),
    }
}

/// Splits `<registry>[/<path>]/<name>[:tag]` into `(registry/path, name)`
pub fn split_image_uri(uri: &str) -> Result<(String, String), ConfigError> {
    let uri = uri.trim();
    let (repository, last) = uri
        .rsplit_once('/')
        .ok_or_else(|| ConfigError::InvalidImageUri(uri.to_string()))?;
    let name = last.split(':').next().unwrap_or(last);

    if repository.is_empty() || name.is_empty() {
        return Err(ConfigError::InvalidImageUri(uri.to_string()));
    }
    Ok((repository.to_string(), name.to_string()))
}

impl fmt::Display for McpdockConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Build:")?;
        writeln!(f, "  Repository: {}", self.build.github_url)?;
        if let Some(sub) = &self.build.subfolder {
            writeln!(f, "  Subfolder: {}", sub)?;
        }
        writeln!(f, "  Image: {}", self.build.image_name())?;
        writeln!(f, "  Push: {}", self.build.push_to_ecr)?;
        if let Some(deploy) = &self.deploy {
            writeln!(f, "Deploy:")?;
            writeln!(f, "  Enabled: {}", deploy.enabled)?;
            if let Some(service) = &deploy.service_name {
                writeln!(f, "  Service: {}", service)?;
            }
            writeln!(f, "  Resources: {} cpu / {} MiB", deploy.cpu, deploy.memory)?;
        }
        Ok(())
    }
}
