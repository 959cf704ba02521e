//! Converge-loop behavior against a scripted engine

use mcpdock::deploy::{
    DeploymentError, MockStackEngine, OrchestratorSettings, StackDescription, StackEvent,
    StackOrchestrator, StackStatus, UpdateOutcome,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

const STACK: &str = "mcp-server-weather";
const TEMPLATE: &str = "Resources: {}";

fn parameters() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("ServiceName".to_string(), "weather".to_string()),
        ("VpcId".to_string(), "vpc-1".to_string()),
    ])
}

fn complete(status: &str) -> StackDescription {
    StackDescription::new(status)
        .with_output("ALBUrl", "http://weather-alb.example.com")
        .with_output("LoadBalancerDNSName", "weather-alb.example.com")
}

fn orchestrator(engine: &Arc<MockStackEngine>) -> StackOrchestrator {
    StackOrchestrator::with_settings(
        engine.clone(),
        OrchestratorSettings {
            poll_interval: Duration::from_secs(30),
            timeout: Duration::from_secs(3600),
            ..OrchestratorSettings::default()
        },
    )
}

#[tokio::test(start_paused = true)]
async fn test_fresh_stack_is_created_and_outputs_returned() {
    let engine = Arc::new(MockStackEngine::new());
    engine
        .push_absent()
        .push_status("CREATE_IN_PROGRESS")
        .push_status("CREATE_IN_PROGRESS")
        .push_description(complete("CREATE_COMPLETE"));

    let result = orchestrator(&engine)
        .apply(STACK, TEMPLATE, &parameters())
        .await
        .unwrap();

    assert_eq!(result.status, StackStatus::CreateComplete);
    assert_eq!(
        result.outputs.get("ALBUrl").map(String::as_str),
        Some("http://weather-alb.example.com")
    );
    assert_eq!(engine.create_calls(), 1);
    assert_eq!(engine.update_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_rollback_complete_is_never_touched() {
    let engine = Arc::new(MockStackEngine::new());
    engine.push_status("ROLLBACK_COMPLETE");

    let err = orchestrator(&engine)
        .apply(STACK, TEMPLATE, &parameters())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        DeploymentError::StaleFailedStack {
            stack: STACK.to_string(),
            status: StackStatus::RollbackComplete,
        }
    );
    assert_eq!(engine.create_calls(), 0);
    assert_eq!(engine.update_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_update_rollback_failed_is_left_to_operator() {
    let engine = Arc::new(MockStackEngine::new());
    engine.push_status("UPDATE_ROLLBACK_FAILED");

    let err = orchestrator(&engine)
        .apply(STACK, TEMPLATE, &parameters())
        .await
        .unwrap_err();

    assert_eq!(err.reason(), "stale-failed-stack");
    assert_eq!(
        err,
        DeploymentError::StaleFailedStack {
            stack: STACK.to_string(),
            status: StackStatus::UpdateRollbackFailed,
        }
    );
    assert_eq!(engine.create_calls(), 0);
    assert_eq!(engine.update_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_second_apply_without_changes_is_success() {
    let engine = Arc::new(MockStackEngine::new());
    engine.push_description(complete("UPDATE_COMPLETE"));
    engine
        .push_update_result(Ok(UpdateOutcome::NoChanges))
        .push_update_result(Ok(UpdateOutcome::NoChanges));

    let orchestrator = orchestrator(&engine);
    let first = orchestrator
        .apply(STACK, TEMPLATE, &parameters())
        .await
        .unwrap();
    let second = orchestrator
        .apply(STACK, TEMPLATE, &parameters())
        .await
        .unwrap();

    assert_eq!(first.status, StackStatus::NoUpdates);
    assert_eq!(second.status, StackStatus::NoUpdates);
    assert_eq!(first.outputs, second.outputs);
    assert_eq!(engine.update_calls(), 2);
    assert_eq!(engine.create_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_update_carries_failure_events() {
    let engine = Arc::new(MockStackEngine::new());
    engine
        .push_description(complete("UPDATE_COMPLETE"))
        .push_status("UPDATE_IN_PROGRESS")
        .push_status("UPDATE_ROLLBACK_COMPLETE");
    engine.push_update_result(Ok(UpdateOutcome::Started));
    engine.set_events(vec![
        StackEvent::new("Service", "UPDATE_FAILED", Some("Circuit breaker triggered")),
        StackEvent::new("TaskDefinition", "UPDATE_COMPLETE", None),
    ]);

    let err = orchestrator(&engine)
        .apply(STACK, TEMPLATE, &parameters())
        .await
        .unwrap_err();

    assert_eq!(err.reason(), "update-failed");
    assert_eq!(
        err.events(),
        ["Service UPDATE_FAILED: Circuit breaker triggered".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_stuck_creation_times_out_without_cancelling() {
    let engine = Arc::new(MockStackEngine::new());
    engine.push_absent().push_status("CREATE_IN_PROGRESS");

    let err = StackOrchestrator::with_settings(
        engine.clone(),
        OrchestratorSettings {
            poll_interval: Duration::from_secs(30),
            timeout: Duration::from_secs(120),
            ..OrchestratorSettings::default()
        },
    )
    .apply(STACK, TEMPLATE, &parameters())
    .await
    .unwrap_err();

    match err {
        DeploymentError::Timeout {
            waited_secs,
            last_status,
            ..
        } => {
            assert_eq!(waited_secs, 120);
            assert_eq!(last_status, StackStatus::CreateInProgress);
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(engine.create_calls(), 1);
}
