//! Container image: tag, build input, Dockerfile, build and push

pub mod builder;
pub mod dockerfile;
pub mod error;
pub mod registry;
pub mod spec;
pub mod tag;

pub use builder::{
    BuiltImage, ContainerBuilder, DockerBuilder, ImageReference, PushedImage,
    RegistryCredentials, LOCAL_REGISTRY,
};
pub use error::BuildError;
pub use registry::{EcrRegistry, ImageRegistry};
pub use spec::{ImageSpec, ImageSpecBuilder};
pub use tag::{Clock, FixedClock, ImageTag, SystemClock, TagGenerator, MAX_TAG_LEN};
