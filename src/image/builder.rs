//! Container build boundary
//!
//! [`ContainerBuilder`] turns a source directory and a Dockerfile into an
//! image and pushes it. [`DockerBuilder`] talks to the local Docker daemon.

use super::dockerfile::SOURCE_DIR;
use super::error::BuildError;
use super::tag::ImageTag;
use async_trait::async_trait;
use bollard::auth::DockerCredentials;
use bollard::image::{BuildImageOptions, PushImageOptions};
use bollard::Docker;
use futures_util::StreamExt;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// Registry prefix for images that are only built locally
pub const LOCAL_REGISTRY: &str = "mcp-local";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageReference {
    registry: String,
    name: String,
    tag: ImageTag,
}

impl ImageReference {
    pub fn new(registry: impl Into<String>, name: impl Into<String>, tag: ImageTag) -> Self {
        Self {
            registry: registry.into().trim_end_matches('/').to_string(),
            name: name.into(),
            tag,
        }
    }

    pub fn local(name: impl Into<String>, tag: ImageTag) -> Self {
        Self::new(LOCAL_REGISTRY, name, tag)
    }

    pub fn registry(&self) -> &str {
        &self.registry
    }

    /// Host part of the registry, e.g. `123.dkr.ecr.us-east-1.amazonaws.com`
    pub fn registry_host(&self) -> &str {
        self.registry.split('/').next().unwrap_or(&self.registry)
    }

    /// Everything between the registry host and the tag
    pub fn repository_path(&self) -> String {
        match self.registry.split_once('/') {
            Some((_, namespace)) => format!("{}/{}", namespace, self.name),
            None => self.name.clone(),
        }
    }

    /// `<registry>/<name>`, without the tag
    pub fn repository(&self) -> String {
        format!("{}/{}", self.registry, self.name)
    }

    pub fn tag(&self) -> &ImageTag {
        &self.tag
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.registry, self.name, self.tag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryCredentials {
    pub username: String,
    pub password: String,
    pub server_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuiltImage {
    pub reference: ImageReference,
    pub image_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushedImage {
    pub reference: ImageReference,
}

impl PushedImage {
    pub fn uri(&self) -> String {
        self.reference.to_string()
    }
}

#[async_trait]
pub trait ContainerBuilder: Send + Sync {
    async fn build(
        &self,
        source_dir: &Path,
        dockerfile: &str,
        image: &ImageReference,
    ) -> Result<BuiltImage, BuildError>;

    async fn push(
        &self,
        image: &ImageReference,
        credentials: &RegistryCredentials,
    ) -> Result<PushedImage, BuildError>;
}

pub struct DockerBuilder {
    docker: Docker,
}

impl DockerBuilder {
    pub fn connect() -> Result<Self, BuildError> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self { docker })
    }

    pub fn with_client(docker: Docker) -> Self {
        Self { docker }
    }
}

/// Packs `source_dir` under `mcp-server/` next to the Dockerfile, as an
/// uncompressed tar
pub fn build_context(source_dir: &Path, dockerfile: &str) -> Result<Vec<u8>, BuildError> {
    let mut builder = tar::Builder::new(Vec::new());
    builder.follow_symlinks(false);
    builder.append_dir_all(SOURCE_DIR, source_dir)?;

    let mut header = tar::Header::new_gnu();
    header.set_size(dockerfile.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, "Dockerfile", dockerfile.as_bytes())?;

    Ok(builder.into_inner()?)
}

#[async_trait]
impl ContainerBuilder for DockerBuilder {
    async fn build(
        &self,
        source_dir: &Path,
        dockerfile: &str,
        image: &ImageReference,
    ) -> Result<BuiltImage, BuildError> {
        info!(image = %image, "Building image");

        let context = build_context(source_dir, dockerfile)?;
        debug!(bytes = context.len(), "Build context packed");

        let options = BuildImageOptions {
            dockerfile: "Dockerfile".to_string(),
            t: image.to_string(),
            rm: true,
            ..Default::default()
        };

        let mut stream = self.docker.build_image(options, None, Some(context.into()));
        let mut image_id = None;

        while let Some(item) = stream.next().await {
            let info = match item {
                Ok(info) => info,
                Err(bollard::errors::Error::DockerStreamError { error }) => {
                    return Err(BuildError::BuildFailed(error));
                }
                Err(e) => return Err(e.into()),
            };

            if let Some(error) = info.error {
                return Err(BuildError::BuildFailed(error));
            }
            if let Some(line) = info.stream.as_deref().map(str::trim_end) {
                if !line.is_empty() {
                    debug!(target: "mcpdock::image::build", "{}", line);
                }
            }
            if let Some(id) = info.aux.and_then(|aux| aux.id) {
                image_id = Some(id);
            }
        }

        info!(image = %image, "Image built");
        Ok(BuiltImage {
            reference: image.clone(),
            image_id,
        })
    }

    async fn push(
        &self,
        image: &ImageReference,
        credentials: &RegistryCredentials,
    ) -> Result<PushedImage, BuildError> {
        info!(image = %image, "Pushing image");

        let options = PushImageOptions {
            tag: image.tag().value().to_string(),
        };
        let auth = DockerCredentials {
            username: Some(credentials.username.clone()),
            password: Some(credentials.password.clone()),
            serveraddress: Some(credentials.server_address.clone()),
            ..Default::default()
        };

        let repository = image.repository();
        let mut stream = self
            .docker
            .push_image(&repository, Some(options), Some(auth));

        while let Some(item) = stream.next().await {
            let info = match item {
                Ok(info) => info,
                Err(bollard::errors::Error::DockerStreamError { error }) => {
                    return Err(BuildError::PushFailed(error));
                }
                Err(e) => return Err(e.into()),
            };

            if let Some(error) = info.error {
                return Err(BuildError::PushFailed(error));
            }
            if let Some(status) = info.status {
                debug!(
                    target: "mcpdock::image::push",
                    progress = info.progress.as_deref().unwrap_or(""),
                    "{}",
                    status
                );
            }
        }

        info!(image = %image, "Image pushed");
        Ok(PushedImage {
            reference: image.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::tag::{generate, FixedClock};
    use chrono::{TimeZone, Utc};
    use std::io::Read;
    use tempfile::TempDir;

    fn tag() -> ImageTag {
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap());
        generate("deadbeefcafe", Some("main"), &clock)
    }

    #[test]
    fn test_local_reference() {
        let image = ImageReference::local("weather", tag());
        assert_eq!(
            image.to_string(),
            "mcp-local/weather:deadbeef-main-20240506-070809"
        );
        assert_eq!(image.repository(), "mcp-local/weather");
    }

    #[test]
    fn test_ecr_reference_parts() {
        let image = ImageReference::new(
            "123456789012.dkr.ecr.us-west-2.amazonaws.com/mcp-servers/",
            "weather",
            tag(),
        );

        assert_eq!(
            image.registry_host(),
            "123456789012.dkr.ecr.us-west-2.amazonaws.com"
        );
        assert_eq!(image.repository_path(), "mcp-servers/weather");
        assert_eq!(
            image.repository(),
            "123456789012.dkr.ecr.us-west-2.amazonaws.com/mcp-servers/weather"
        );

        let bare = ImageReference::new("registry.example.com", "weather", tag());
        assert_eq!(bare.repository_path(), "weather");
    }

    #[test]
    fn test_build_context_layout() {
        let source = TempDir::new().unwrap();
        std::fs::write(source.path().join("server.py"), "print('hi')").unwrap();
        std::fs::create_dir(source.path().join("pkg")).unwrap();
        std::fs::write(source.path().join("pkg/__init__.py"), "").unwrap();

        let context = build_context(source.path(), "FROM scratch\n").unwrap();

        let mut archive = tar::Archive::new(&context[..]);
        let mut names = Vec::new();
        let mut dockerfile = String::new();
        for entry in archive.entries().unwrap() {
            let mut entry = entry.unwrap();
            let path = entry.path().unwrap().to_string_lossy().to_string();
            if path == "Dockerfile" {
                entry.read_to_string(&mut dockerfile).unwrap();
            }
            names.push(path);
        }

        assert!(names.iter().any(|n| n == "mcp-server/server.py"));
        assert!(names.iter().any(|n| n == "mcp-server/pkg/__init__.py"));
        assert_eq!(dockerfile, "FROM scratch\n");
    }
}
