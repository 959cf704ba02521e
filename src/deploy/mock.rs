//! Scripted [`StackEngine`] for tests
//!
//! Describe responses are consumed in order and the last one repeats, so a
//! single `CREATE_IN_PROGRESS` entry keeps a stack in progress forever.

use super::engine::{StackDescription, StackEngine, StackEvent, UpdateOutcome};
use super::error::EngineError;
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Describe(String),
    Create {
        name: String,
        template: String,
        parameters: BTreeMap<String, String>,
    },
    Update {
        name: String,
        template: String,
        parameters: BTreeMap<String, String>,
    },
    ListEvents(String),
}

type DescribeResult = Result<Option<StackDescription>, EngineError>;

#[derive(Default)]
pub struct MockStackEngine {
    describes: Mutex<VecDeque<DescribeResult>>,
    creates: Mutex<VecDeque<Result<(), EngineError>>>,
    updates: Mutex<VecDeque<Result<UpdateOutcome, EngineError>>>,
    events: Mutex<Vec<StackEvent>>,
    calls: Mutex<Vec<EngineCall>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl MockStackEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a describe response with the given raw status
    pub fn push_status(&self, raw_status: &str) -> &Self {
        self.push_describe(Ok(Some(StackDescription::new(raw_status))))
    }

    pub fn push_absent(&self) -> &Self {
        self.push_describe(Ok(None))
    }

    pub fn push_description(&self, description: StackDescription) -> &Self {
        self.push_describe(Ok(Some(description)))
    }

    pub fn push_describe(&self, result: DescribeResult) -> &Self {
        lock(&self.describes).push_back(result);
        self
    }

    pub fn push_create_result(&self, result: Result<(), EngineError>) -> &Self {
        lock(&self.creates).push_back(result);
        self
    }

    pub fn push_update_result(&self, result: Result<UpdateOutcome, EngineError>) -> &Self {
        lock(&self.updates).push_back(result);
        self
    }

    pub fn set_events(&self, events: Vec<StackEvent>) -> &Self {
        *lock(&self.events) = events;
        self
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        lock(&self.calls).clone()
    }

    pub fn create_calls(&self) -> usize {
        self.count(|c| matches!(c, EngineCall::Create { .. }))
    }

    pub fn update_calls(&self) -> usize {
        self.count(|c| matches!(c, EngineCall::Update { .. }))
    }

    pub fn describe_calls(&self) -> usize {
        self.count(|c| matches!(c, EngineCall::Describe(_)))
    }

    pub fn list_event_calls(&self) -> usize {
        self.count(|c| matches!(c, EngineCall::ListEvents(_)))
    }

    fn count(&self, predicate: impl Fn(&EngineCall) -> bool) -> usize {
        lock(&self.calls).iter().filter(|c| predicate(c)).count()
    }

    fn record(&self, call: EngineCall) {
        lock(&self.calls).push(call);
    }
}

#[async_trait]
impl StackEngine for MockStackEngine {
    async fn describe_stack(&self, name: &str) -> Result<Option<StackDescription>, EngineError> {
        self.record(EngineCall::Describe(name.to_string()));
        let mut queue = lock(&self.describes);
        let next = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        next.unwrap_or(Ok(None))
    }

    async fn create_stack(
        &self,
        name: &str,
        template: &str,
        parameters: &BTreeMap<String, String>,
    ) -> Result<(), EngineError> {
        self.record(EngineCall::Create {
            name: name.to_string(),
            template: template.to_string(),
            parameters: parameters.clone(),
        });
        lock(&self.creates).pop_front().unwrap_or(Ok(()))
    }

    async fn update_stack(
        &self,
        name: &str,
        template: &str,
        parameters: &BTreeMap<String, String>,
    ) -> Result<UpdateOutcome, EngineError> {
        self.record(EngineCall::Update {
            name: name.to_string(),
            template: template.to_string(),
            parameters: parameters.clone(),
        });
        lock(&self.updates)
            .pop_front()
            .unwrap_or(Ok(UpdateOutcome::Started))
    }

    async fn list_events(&self, name: &str) -> Result<Vec<StackEvent>, EngineError> {
        self.record(EngineCall::ListEvents(name.to_string()));
        Ok(lock(&self.events).clone())
    }
}
