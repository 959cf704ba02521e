//! Stack deployment: parameters, template, engine boundary and the
//! converge loop

pub mod aws_engine;
pub mod engine;
pub mod error;
pub mod mock;
pub mod orchestrator;
pub mod params;
pub mod status;
pub mod template;

pub use aws_engine::AwsCliEngine;
pub use engine::{StackDescription, StackEngine, StackEvent, UpdateOutcome};
pub use error::{DeploymentError, EngineError};
pub use mock::{EngineCall, MockStackEngine};
pub use orchestrator::{DeploymentResult, OrchestratorSettings, StackOrchestrator};
pub use params::{stack_name, DeployParameters};
pub use status::StackStatus;
