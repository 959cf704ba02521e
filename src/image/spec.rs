//! Input for the container build

use super::error::BuildError;
use super::tag::ImageTag;
use crate::detection::{EntrypointSpec, PackageManagerProfile, Resolution, Transport};
use serde::Serialize;
use std::collections::BTreeMap;

/// Everything the Dockerfile renderer and builder need
#[derive(Debug, Clone, Serialize)]
pub struct ImageSpec {
    pub package_manager_profile: PackageManagerProfile,
    pub entrypoint: EntrypointSpec,
    pub transport: Transport,
    pub environment_variables: BTreeMap<String, String>,
    pub tag: ImageTag,
}

impl ImageSpec {
    pub fn entrypoint_proxy_command(&self) -> String {
        self.entrypoint.proxy_command()
    }

    pub fn port(&self) -> u16 {
        self.entrypoint.port()
    }
}

/// Assembles an [`ImageSpec`]. Taking a [`Resolution`] means it can only be
/// built after detection succeeded.
#[derive(Debug, Clone)]
pub struct ImageSpecBuilder {
    resolution: Resolution,
    environment_variables: BTreeMap<String, String>,
}

impl ImageSpecBuilder {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            environment_variables: BTreeMap::new(),
        }
    }

    pub fn environment_variables<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.environment_variables
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn build(self, tag: ImageTag) -> Result<ImageSpec, BuildError> {
        for (name, value) in &self.environment_variables {
            let problem = if !is_valid_env_name(name) {
                "name must match [A-Za-z_][A-Za-z0-9_]*"
            } else if value.contains(['\n', '\r']) {
                "value spans multiple lines"
            } else {
                continue;
            };
            return Err(BuildError::InvalidEnvironment {
                name: name.clone(),
                problem,
            });
        }

        Ok(ImageSpec {
            package_manager_profile: self.resolution.profile,
            entrypoint: self.resolution.entrypoint,
            transport: self.resolution.transport,
            environment_variables: self.environment_variables,
            tag,
        })
    }
}

fn is_valid_env_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
