//! Infrastructure engine boundary

use super::error::EngineError;
use super::status::StackStatus;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One fresh read of a remote stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackDescription {
    /// Status exactly as the engine reported it
    pub raw_status: String,
    pub status_reason: Option<String>,
    pub outputs: BTreeMap<String, String>,
}

impl StackDescription {
    pub fn new(raw_status: impl Into<String>) -> Self {
        Self {
            raw_status: raw_status.into(),
            status_reason: None,
            outputs: BTreeMap::new(),
        }
    }

    pub fn with_output(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.outputs.insert(key.into(), value.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.status_reason = Some(reason.into());
        self
    }

    /// `None` when the raw status is outside the states this tool drives
    pub fn status(&self) -> Option<StackStatus> {
        StackStatus::from_cloudformation(&self.raw_status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Started,
    /// The engine reported the stack already matches the template
    NoChanges,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackEvent {
    pub timestamp: Option<String>,
    pub logical_resource_id: String,
    pub resource_status: String,
    pub reason: Option<String>,
}

impl StackEvent {
    pub fn new(
        logical_resource_id: impl Into<String>,
        resource_status: impl Into<String>,
        reason: Option<&str>,
    ) -> Self {
        Self {
            timestamp: None,
            logical_resource_id: logical_resource_id.into(),
            resource_status: resource_status.into(),
            reason: reason.map(str::to_string),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.resource_status.ends_with("_FAILED")
    }

    /// `<resource> <STATUS>: <reason>`
    pub fn summary(&self) -> String {
        match &self.reason {
            Some(reason) => format!(
                "{} {}: {}",
                self.logical_resource_id, self.resource_status, reason
            ),
            None => format!("{} {}", self.logical_resource_id, self.resource_status),
        }
    }
}

/// Remote infrastructure-as-code engine.
///
/// Implementations translate engine-specific signals into the structured
/// values here: a missing stack is `Ok(None)` from `describe_stack`, an
/// update with nothing to change is `UpdateOutcome::NoChanges`.
#[async_trait]
pub trait StackEngine: Send + Sync {
    async fn describe_stack(&self, name: &str) -> Result<Option<StackDescription>, EngineError>;

    async fn create_stack(
        &self,
        name: &str,
        template: &str,
        parameters: &BTreeMap<String, String>,
    ) -> Result<(), EngineError>;

    async fn update_stack(
        &self,
        name: &str,
        template: &str,
        parameters: &BTreeMap<String, String>,
    ) -> Result<UpdateOutcome, EngineError>;

    /// Events, most recent first
    async fn list_events(&self, name: &str) -> Result<Vec<StackEvent>, EngineError>;
}
