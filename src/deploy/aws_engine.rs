//! CloudFormation through the `aws` command-line client

use super::engine::{StackDescription, StackEngine, StackEvent, UpdateOutcome};
use super::error::EngineError;
use crate::aws::{AwsCli, AwsCliError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::{debug, info};

const CAPABILITIES: &str = "CAPABILITY_NAMED_IAM";
const MISSING_STACK_MARKER: &str = "does not exist";
const NO_UPDATES_MARKER: &str = "No updates are to be performed";

pub struct AwsCliEngine {
    cli: AwsCli,
}

impl AwsCliEngine {
    pub fn new(cli: AwsCli) -> Self {
        Self { cli }
    }

    /// Template and parameters travel as `file://` arguments; the returned
    /// files must outlive the CLI call.
    fn write_inputs(
        template: &str,
        parameters: &BTreeMap<String, String>,
    ) -> Result<(NamedTempFile, NamedTempFile), EngineError> {
        let template_file = write_temp(".yaml", template)?;
        let params_file = write_temp(".json", &parameters_json(parameters).to_string())?;
        Ok((template_file, params_file))
    }

    fn mutation_args(
        operation: &str,
        name: &str,
        template_file: &NamedTempFile,
        params_file: &NamedTempFile,
    ) -> Vec<String> {
        vec![
            "cloudformation".to_string(),
            operation.to_string(),
            "--stack-name".to_string(),
            name.to_string(),
            "--template-body".to_string(),
            format!("file://{}", template_file.path().display()),
            "--parameters".to_string(),
            format!("file://{}", params_file.path().display()),
            "--capabilities".to_string(),
            CAPABILITIES.to_string(),
        ]
    }
}

fn write_temp(suffix: &str, content: &str) -> Result<NamedTempFile, EngineError> {
    let mut file = tempfile::Builder::new()
        .prefix("mcpdock-")
        .suffix(suffix)
        .tempfile()
        .map_err(|e| EngineError::Invocation(format!("failed to create temp file: {}", e)))?;
    file.write_all(content.as_bytes())
        .and_then(|_| file.flush())
        .map_err(|e| EngineError::Invocation(format!("failed to write temp file: {}", e)))?;
    Ok(file)
}

fn is_missing_stack(err: &AwsCliError) -> bool {
    matches!(err, AwsCliError::Rejected { code, message, .. }
        if code == "ValidationError" && message.contains(MISSING_STACK_MARKER))
}

fn is_no_updates(err: &AwsCliError) -> bool {
    matches!(err, AwsCliError::Rejected { message, .. } if message.contains(NO_UPDATES_MARKER))
}

/// `[{"ParameterKey": k, "ParameterValue": v}, ...]`
pub fn parameters_json(parameters: &BTreeMap<String, String>) -> Value {
    Value::Array(
        parameters
            .iter()
            .map(|(k, v)| json!({ "ParameterKey": k, "ParameterValue": v }))
            .collect(),
    )
}

/// Reads the first stack of a `describe-stacks` response
pub fn parse_describe(value: &Value) -> Result<Option<StackDescription>, EngineError> {
    let Some(stack) = value
        .get("Stacks")
        .and_then(Value::as_array)
        .and_then(|stacks| stacks.first())
    else {
        return Ok(None);
    };

    let raw_status = stack
        .get("StackStatus")
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::InvalidResponse("stack without StackStatus".to_string()))?;

    let mut description = StackDescription::new(raw_status);
    if let Some(reason) = stack.get("StackStatusReason").and_then(Value::as_str) {
        description = description.with_reason(reason);
    }
    for output in stack
        .get("Outputs")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        if let (Some(key), Some(value)) = (
            output.get("OutputKey").and_then(Value::as_str),
            output.get("OutputValue").and_then(Value::as_str),
        ) {
            description = description.with_output(key, value);
        }
    }
    Ok(Some(description))
}

/// Reads a `describe-stack-events` response, keeping the engine's order
pub fn parse_events(value: &Value) -> Vec<StackEvent> {
    value
        .get("StackEvents")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|event| {
            let resource = event.get("LogicalResourceId")?.as_str()?;
            let status = event.get("ResourceStatus")?.as_str()?;
            let reason = event.get("ResourceStatusReason").and_then(Value::as_str);
            let mut parsed = StackEvent::new(resource, status, reason);
            parsed.timestamp = event
                .get("Timestamp")
                .and_then(Value::as_str)
                .map(str::to_string);
            Some(parsed)
        })
        .collect()
}

#[async_trait]
impl StackEngine for AwsCliEngine {
    async fn describe_stack(&self, name: &str) -> Result<Option<StackDescription>, EngineError> {
        let args = [
            "cloudformation".to_string(),
            "describe-stacks".to_string(),
            "--stack-name".to_string(),
            name.to_string(),
        ];
        match self.cli.run_json(&args).await {
            Ok(value) => parse_describe(&value),
            Err(e) if is_missing_stack(&e) => {
                debug!(stack = %name, "Stack does not exist");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn create_stack(
        &self,
        name: &str,
        template: &str,
        parameters: &BTreeMap<String, String>,
    ) -> Result<(), EngineError> {
        let (template_file, params_file) = Self::write_inputs(template, parameters)?;
        let args = Self::mutation_args("create-stack", name, &template_file, &params_file);
        let response = self.cli.run_json(&args).await?;
        let stack_id = response
            .get("StackId")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        info!(stack = %name, stack_id = %stack_id, "Stack creation started");
        Ok(())
    }

    async fn update_stack(
        &self,
        name: &str,
        template: &str,
        parameters: &BTreeMap<String, String>,
    ) -> Result<UpdateOutcome, EngineError> {
        let (template_file, params_file) = Self::write_inputs(template, parameters)?;
        let args = Self::mutation_args("update-stack", name, &template_file, &params_file);
        match self.cli.run_json(&args).await {
            Ok(_) => {
                info!(stack = %name, "Stack update started");
                Ok(UpdateOutcome::Started)
            }
            Err(e) if is_no_updates(&e) => Ok(UpdateOutcome::NoChanges),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_events(&self, name: &str) -> Result<Vec<StackEvent>, EngineError> {
        let args = [
            "cloudformation".to_string(),
            "describe-stack-events".to_string(),
            "--stack-name".to_string(),
            name.to_string(),
        ];
        let value = self.cli.run_json(&args).await?;
        Ok(parse_events(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::status::StackStatus;

    #[test]
    fn test_parse_describe() {
        let value = json!({
            "Stacks": [{
                "StackName": "mcp-server-weather",
                "StackStatus": "CREATE_COMPLETE",
                "Outputs": [
                    {"OutputKey": "ALBUrl", "OutputValue": "http://weather.elb.amazonaws.com"},
                    {"OutputKey": "LoadBalancerDNSName", "OutputValue": "weather.elb.amazonaws.com"}
                ]
            }]
        });

        let description = parse_describe(&value).unwrap().unwrap();
        assert_eq!(description.status(), Some(StackStatus::CreateComplete));
        assert_eq!(description.outputs.len(), 2);
        assert_eq!(
            description.outputs["ALBUrl"],
            "http://weather.elb.amazonaws.com"
        );
    }

    #[test]
    fn test_parse_describe_without_stacks() {
        assert!(parse_describe(&json!({"Stacks": []})).unwrap().is_none());
        assert!(parse_describe(&Value::Null).unwrap().is_none());
        assert!(parse_describe(&json!({"Stacks": [{"StackName": "x"}]})).is_err());
    }

    #[test]
    fn test_parse_events() {
        let value = json!({
            "StackEvents": [
                {
                    "LogicalResourceId": "Service",
                    "ResourceStatus": "CREATE_FAILED",
                    "ResourceStatusReason": "Circuit breaker",
                    "Timestamp": "2024-05-01T10:00:00Z"
                },
                {"LogicalResourceId": "Cluster", "ResourceStatus": "CREATE_COMPLETE"},
                {"ResourceStatus": "CREATE_COMPLETE"}
            ]
        });

        let events = parse_events(&value);
        assert_eq!(events.len(), 2);
        assert!(events[0].is_failure());
        assert_eq!(events[0].timestamp.as_deref(), Some("2024-05-01T10:00:00Z"));
        assert_eq!(events[1].summary(), "Cluster CREATE_COMPLETE");
    }

    #[test]
    fn test_parameters_json() {
        let params = BTreeMap::from([
            ("ServiceName".to_string(), "weather".to_string()),
            ("VpcId".to_string(), "vpc-1".to_string()),
        ]);
        assert_eq!(
            parameters_json(&params),
            json!([
                {"ParameterKey": "ServiceName", "ParameterValue": "weather"},
                {"ParameterKey": "VpcId", "ParameterValue": "vpc-1"}
            ])
        );
    }

    #[test]
    fn test_engine_specific_messages_are_recognised() {
        let missing = AwsCliError::Rejected {
            code: "ValidationError".into(),
            operation: "DescribeStacks".into(),
            message: "Stack with id mcp-server-weather does not exist".into(),
        };
        assert!(is_missing_stack(&missing));
        assert!(!is_no_updates(&missing));

        let no_updates = AwsCliError::Rejected {
            code: "ValidationError".into(),
            operation: "UpdateStack".into(),
            message: "No updates are to be performed.".into(),
        };
        assert!(is_no_updates(&no_updates));
        assert!(!is_missing_stack(&no_updates));
    }

    #[test]
    fn test_mutation_args_reference_files() {
        let (template, params) = AwsCliEngine::write_inputs("Resources: {}", &BTreeMap::new()).unwrap();
        let args = AwsCliEngine::mutation_args("create-stack", "mcp-server-x", &template, &params);

        assert_eq!(args[1], "create-stack");
        assert!(args[5].starts_with("file://") && args[5].ends_with(".yaml"));
        assert!(args[7].ends_with(".json"));
        assert_eq!(args.last().map(String::as_str), Some(CAPABILITIES));
        assert_eq!(std::fs::read_to_string(template.path()).unwrap(), "Resources: {}");
    }
}
