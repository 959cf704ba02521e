//! Converges a named stack to a template
//!
//! ```text
//! describe ─┬─ absent ──────────────► create ─► poll ─► result
//!           ├─ create-failed/rollback-complete ─► stale-failed-stack
//!           ├─ in progress ─► poll (rejoin) ─► describe again
//!           └─ complete/update-failed ─► update ─┬─ no changes ─► result
//!                                                └─ started ─► poll ─► result
//! ```
//!
//! Reads are retried on transient engine errors. Create and update are
//! issued once and their errors surfaced as-is.

use super::engine::{StackDescription, StackEngine, UpdateOutcome};
use super::error::{DeploymentError, EngineError};
use super::status::StackStatus;
use crate::util::BackoffPolicy;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_MAX_FAILURE_EVENTS: usize = 5;

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub poll_interval: Duration,
    pub timeout: Duration,
    pub read_backoff: BackoffPolicy,
    pub max_failure_events: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            read_backoff: BackoffPolicy::default(),
            max_failure_events: DEFAULT_MAX_FAILURE_EVENTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentResult {
    pub stack_name: String,
    pub status: StackStatus,
    pub outputs: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Create,
    Update,
}

pub struct StackOrchestrator {
    engine: Arc<dyn StackEngine>,
    settings: OrchestratorSettings,
}

impl StackOrchestrator {
    pub fn new(engine: Arc<dyn StackEngine>) -> Self {
        Self::with_settings(engine, OrchestratorSettings::default())
    }

    pub fn with_settings(engine: Arc<dyn StackEngine>, settings: OrchestratorSettings) -> Self {
        Self { engine, settings }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub async fn apply(
        &self,
        stack_name: &str,
        template: &str,
        parameters: &BTreeMap<String, String>,
    ) -> Result<DeploymentResult, DeploymentError> {
        let mut current = self.describe(stack_name).await?;

        if let Some(status) = current.as_ref().and_then(StackDescription::status) {
            if status.is_in_progress() {
                info!(
                    stack = %stack_name,
                    status = %status,
                    "Stack operation already in progress, waiting for it to settle"
                );
                current = self.wait_until_settled(stack_name, status).await?;
            }
        }

        let Some(description) = current else {
            return self.create(stack_name, template, parameters).await;
        };

        let status = description.status().ok_or_else(|| DeploymentError::UnexpectedStatus {
            stack: stack_name.to_string(),
            raw_status: description.raw_status.clone(),
        })?;

        debug!(stack = %stack_name, status = %status, "Current stack status");

        match status {
            StackStatus::Absent => self.create(stack_name, template, parameters).await,
            s if s.is_stale_failure() => Err(DeploymentError::StaleFailedStack {
                stack: stack_name.to_string(),
                status: s,
            }),
            StackStatus::CreateComplete
            | StackStatus::UpdateComplete
            | StackStatus::UpdateFailed
            | StackStatus::NoUpdates => {
                self.update(stack_name, template, parameters, description)
                    .await
            }
            other => Err(DeploymentError::UnexpectedStatus {
                stack: stack_name.to_string(),
                raw_status: other.to_string(),
            }),
        }
    }

    async fn create(
        &self,
        stack_name: &str,
        template: &str,
        parameters: &BTreeMap<String, String>,
    ) -> Result<DeploymentResult, DeploymentError> {
        info!(stack = %stack_name, "Creating stack");
        self.engine
            .create_stack(stack_name, template, parameters)
            .await?;

        let settled = self
            .wait_until_settled(stack_name, StackStatus::CreateInProgress)
            .await?;
        self.finish(stack_name, Operation::Create, settled).await
    }

    async fn update(
        &self,
        stack_name: &str,
        template: &str,
        parameters: &BTreeMap<String, String>,
        current: StackDescription,
    ) -> Result<DeploymentResult, DeploymentError> {
        info!(stack = %stack_name, "Updating stack");
        match self
            .engine
            .update_stack(stack_name, template, parameters)
            .await?
        {
            UpdateOutcome::NoChanges => {
                info!(stack = %stack_name, "No updates to perform, stack is up to date");
                Ok(DeploymentResult {
                    stack_name: stack_name.to_string(),
                    status: StackStatus::NoUpdates,
                    outputs: current.outputs,
                })
            }
            UpdateOutcome::Started => {
                let settled = self
                    .wait_until_settled(stack_name, StackStatus::UpdateInProgress)
                    .await?;
                self.finish(stack_name, Operation::Update, settled).await
            }
        }
    }

    async fn describe(&self, stack_name: &str) -> Result<Option<StackDescription>, EngineError> {
        self.settings
            .read_backoff
            .retry(
                "describe stack",
                || self.engine.describe_stack(stack_name),
                EngineError::is_transient,
            )
            .await
    }

    /// Polls until the stack leaves its in-progress state or the deadline
    /// passes. The remote operation is never cancelled.
    async fn wait_until_settled(
        &self,
        stack_name: &str,
        initial: StackStatus,
    ) -> Result<Option<StackDescription>, DeploymentError> {
        let started = Instant::now();
        let deadline = started + self.settings.timeout;
        let mut last_status = initial;

        loop {
            let now = Instant::now();
            if now >= deadline {
                warn!(
                    stack = %stack_name,
                    status = %last_status,
                    "Gave up waiting for stack"
                );
                return Err(DeploymentError::Timeout {
                    stack: stack_name.to_string(),
                    waited_secs: started.elapsed().as_secs(),
                    last_status,
                });
            }

            tokio::time::sleep(self.settings.poll_interval.min(deadline - now)).await;

            let description = self.describe(stack_name).await?;
            match description.as_ref().and_then(StackDescription::status) {
                Some(status) if status.is_in_progress() => {
                    debug!(
                        stack = %stack_name,
                        status = %status,
                        elapsed_secs = started.elapsed().as_secs(),
                        "Stack still in progress"
                    );
                    last_status = status;
                }
                _ => return Ok(description),
            }
        }
    }

    async fn finish(
        &self,
        stack_name: &str,
        operation: Operation,
        settled: Option<StackDescription>,
    ) -> Result<DeploymentResult, DeploymentError> {
        let Some(description) = settled else {
            // Stack vanished while we waited, e.g. rolled back and deleted
            return Err(self.failure(stack_name, operation).await);
        };

        match description.status() {
            Some(status @ (StackStatus::CreateComplete | StackStatus::UpdateComplete)) => {
                info!(stack = %stack_name, status = %status, "Stack converged");
                Ok(DeploymentResult {
                    stack_name: stack_name.to_string(),
                    status,
                    outputs: description.outputs,
                })
            }
            Some(
                StackStatus::CreateFailed
                | StackStatus::RollbackComplete
                | StackStatus::UpdateFailed
                | StackStatus::UpdateRollbackFailed
                | StackStatus::Absent,
            ) => Err(self.failure(stack_name, operation).await),
            _ => Err(DeploymentError::UnexpectedStatus {
                stack: stack_name.to_string(),
                raw_status: description.raw_status,
            }),
        }
    }

    async fn failure(&self, stack_name: &str, operation: Operation) -> DeploymentError {
        let events = self.failure_events(stack_name).await;
        for event in &events {
            warn!(stack = %stack_name, event = %event, "Stack failure event");
        }
        match operation {
            Operation::Create => DeploymentError::CreateFailed {
                stack: stack_name.to_string(),
                events,
            },
            Operation::Update => DeploymentError::UpdateFailed {
                stack: stack_name.to_string(),
                events,
            },
        }
    }

    /// Most recent failure events; an unreadable history yields none
    async fn failure_events(&self, stack_name: &str) -> Vec<String> {
        let result = self
            .settings
            .read_backoff
            .retry(
                "list stack events",
                || self.engine.list_events(stack_name),
                EngineError::is_transient,
            )
            .await;

        match result {
            Ok(events) => events
                .iter()
                .filter(|e| e.is_failure())
                .take(self.settings.max_failure_events)
                .map(|e| e.summary())
                .collect(),
            Err(e) => {
                warn!(stack = %stack_name, error = %e, "Could not read stack events");
                Vec::new()
            }
        }
    }
}
