//! Output formatting for command results
//!
//! Results go to stdout in either JSON (machine-readable) or a short
//! human-readable report. Logs never go through here.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::client_config::setup_instructions;
use crate::detection::Detection;
use crate::pipeline::PipelineOutcome;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_detection(&self, detection: &Detection) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(detection, "detection result"),
            OutputFormat::Human => Ok(format_detection_human(detection)),
        }
    }

    pub fn format_outcome(&self, outcome: &PipelineOutcome) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(outcome, "pipeline result"),
            OutputFormat::Human => Ok(format_outcome_human(outcome)),
        }
    }
}

fn to_json<T: Serialize>(value: &T, what: &str) -> Result<String> {
    serde_json::to_string_pretty(value).with_context(|| format!("Failed to serialize {} to JSON", what))
}

fn format_detection_human(detection: &Detection) -> String {
    let resolution = &detection.resolution;
    let mut output = String::new();

    output.push_str("\u{2713} MCP Server Detection\n");
    output.push_str(RULE);
    output.push_str("\n\n");

    let manifest = resolution
        .profile
        .manifest_path
        .as_deref()
        .map(|m| format!(" ({})", m))
        .unwrap_or_default();
    output.push_str(&format!(
        "Package Manager: {}{}\n",
        resolution.profile.manager, manifest
    ));
    output.push_str(&format!(
        "Chosen From:     {}\n",
        resolution
            .source
            .map(|s| s.to_string())
            .unwrap_or_else(|| "override".to_string())
    ));
    output.push_str(&format!("Transport:       {}\n\n", resolution.transport));

    output.push_str("Entry Point:\n");
    let entrypoint = &resolution.entrypoint;
    let mut command = vec![entrypoint.command().to_string()];
    command.extend(entrypoint.args().iter().cloned());
    output.push_str(&format!("\u{251C}\u{2500} Command: {}\n", command.join(" ")));
    output.push_str(&format!(
        "\u{2514}\u{2500} Proxy:   {}\n",
        entrypoint.proxy_command()
    ));

    if !detection.candidates.is_empty() {
        output.push_str("\nCandidates:\n");
        for (i, candidate) in detection.candidates.iter().enumerate() {
            let connector = if i + 1 == detection.candidates.len() {
                "\u{2514}"
            } else {
                "\u{251C}"
            };
            output.push_str(&format!("{}\u{2500} {}\n", connector, candidate));
        }
    }

    output
}

fn format_outcome_human(outcome: &PipelineOutcome) -> String {
    let mut output = format_detection_human(&outcome.detection);

    output.push_str("\nImage:\n");
    output.push_str(&format!("\u{251C}\u{2500} Reference: {}\n", outcome.image));
    output.push_str(&format!(
        "\u{2514}\u{2500} Pushed:    {}\n",
        if outcome.pushed { "yes" } else { "no" }
    ));

    if let Some(deployment) = &outcome.deployment {
        output.push_str("\nDeployment:\n");
        output.push_str(&format!("\u{251C}\u{2500} Stack:  {}\n", deployment.stack_name));
        output.push_str(&format!("\u{2514}\u{2500} Status: {}\n", deployment.status));
    }

    if let Some(config) = &outcome.client_config {
        output.push('\n');
        output.push_str(&setup_instructions(config));
    }

    output
}
