//! Long-lived collaborators of a pipeline run

use crate::deploy::StackEngine;
use crate::image::{Clock, ContainerBuilder, ImageRegistry, SystemClock};
use crate::repository::RepositoryHost;
use std::sync::Arc;

/// Owns every boundary the pipeline talks to. Registry and engine are only
/// needed when pushing and deploying.
#[derive(Clone)]
pub struct PipelineContext {
    pub repository_host: Arc<dyn RepositoryHost>,
    pub builder: Arc<dyn ContainerBuilder>,
    pub registry: Option<Arc<dyn ImageRegistry>>,
    pub engine: Option<Arc<dyn StackEngine>>,
    pub clock: Arc<dyn Clock>,
}

impl PipelineContext {
    pub fn new(
        repository_host: Arc<dyn RepositoryHost>,
        builder: Arc<dyn ContainerBuilder>,
    ) -> Self {
        Self {
            repository_host,
            builder,
            registry: None,
            engine: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_registry(mut self, registry: Arc<dyn ImageRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_engine(mut self, engine: Arc<dyn StackEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}
