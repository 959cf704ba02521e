//! mcpdock - turns stdio MCP servers into HTTP container services
//!
//! Given a repository that hosts a Model Context Protocol server speaking
//! over stdio, mcpdock works out how the server is launched, wraps that
//! command in an HTTP proxy inside a container image, and converges an ECS
//! service stack behind a load balancer running it.
//!
//! # Example
//!
//! ```no_run
//! use mcpdock::detection::{detect, ProxyOptions};
//! use mcpdock::fs::RealFileSystem;
//! use mcpdock::repository::RepositorySnapshot;
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! let snapshot = RepositorySnapshot::load(&RealFileSystem, Path::new("./weather-mcp"))?;
//! let detection = detect(&snapshot, None, ProxyOptions::default())?;
//! println!("{}", detection.entrypoint().proxy_command());
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`repository`]: fetching repositories and snapshotting them
//! - [`detection`]: package manager, launch-command candidates, resolution
//! - [`image`]: image tags, image spec, Dockerfile, build and push
//! - [`deploy`]: stack template, engine boundary and the converge loop
//! - [`client_config`]: connection descriptor for MCP clients
//! - [`pipeline`]: the end-to-end run

pub mod aws;
pub mod cli;
pub mod client_config;
pub mod config;
pub mod deploy;
pub mod detection;
pub mod fs;
pub mod image;
pub mod pipeline;
pub mod repository;
pub mod util;

pub use client_config::{ClientConfig, ClientConfigEmitter, TransportKind};
pub use config::{ConfigError, McpdockConfig};
pub use deploy::{DeploymentError, DeploymentResult, StackOrchestrator, StackStatus};
pub use detection::{detect, Detection, DetectionError, EntrypointSpec};
pub use image::{ImageSpec, ImageSpecBuilder, ImageTag, TagGenerator};
pub use pipeline::{Pipeline, PipelineContext, PipelineError};
pub use repository::RepositorySnapshot;
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "mcpdock");
    }
}
