//! README scanning
//!
//! Two rules, tried in order:
//! 1. fenced blocks holding an MCP client configuration (`mcpServers`, or the
//!    `servers` map used by editor configs), one candidate per server entry;
//! 2. only when rule 1 found nothing, fenced shell blocks whose first command
//!    is a known interpreter or package runner.

use super::types::{CandidateSource, CommandCandidate};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use tracing::debug;

/// Interpreters and package runners that start a server directly
const SHELL_RUNNERS: &[&str] = &[
    "uvx", "npx", "uv", "python", "python3", "node", "pipx", "poetry", "deno", "bun",
];

/// Runners that need a `run` subcommand to launch something
const RUN_SUBCOMMAND_RUNNERS: &[&str] = &["uv", "poetry", "pipx"];

/// Second tokens that mean "set something up", not "start the server"
const SETUP_VERBS: &[&str] = &["install", "i", "add", "sync", "init", "build", "test", "pip"];

/// Python modules that are tooling rather than servers
const TOOLING_MODULES: &[&str] = &["pip", "venv", "build", "pytest", "unittest"];

const SHELL_FENCE_LANGS: &[&str] = &["", "bash", "sh", "shell", "console", "zsh", "terminal"];

const SHELL_OPERATORS: &[&str] = &["|", "||", "&&", ";", ">", ">>", "2>", "&"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock<'a> {
    pub lang: &'a str,
    pub body: &'a str,
}

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?ms)^[ \t]*```[ \t]*([A-Za-z0-9_+.-]*)[^\n]*\n(.*?)^[ \t]*```")
            .expect("fence regex is valid")
    })
}

/// Fenced code blocks of a Markdown document, in document order
pub fn code_blocks(text: &str) -> Vec<CodeBlock<'_>> {
    fence_regex()
        .captures_iter(text)
        .filter_map(|caps| {
            Some(CodeBlock {
                lang: caps.get(1)?.as_str(),
                body: caps.get(2)?.as_str(),
            })
        })
        .collect()
}

/// Candidates declared in MCP client configuration blocks
pub fn json_candidates(readme: &str) -> Vec<CommandCandidate> {
    let mut candidates = Vec::new();

    for block in code_blocks(readme) {
        if !block.body.trim_start().starts_with('{') {
            continue;
        }
        let value: Value = match serde_json::from_str(block.body) {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, "Skipping unparseable JSON block");
                continue;
            }
        };
        let Some(servers) = server_definitions(&value) else {
            continue;
        };

        for (name, definition) in servers {
            let Some(command) = definition.get("command").and_then(Value::as_str) else {
                debug!(server = %name, "Server entry without command, skipping");
                continue;
            };

            let mut tokens = vec![command.to_string()];
            if let Some(args) = definition.get("args").and_then(Value::as_array) {
                tokens.extend(args.iter().filter_map(arg_to_string));
            }

            if let Some(candidate) = CommandCandidate::new(tokens, CandidateSource::ReadmeJson) {
                debug!(server = %name, candidate = %candidate, "Found MCP server definition");
                candidates.push(candidate);
            }
        }
    }

    candidates
}

fn server_definitions(value: &Value) -> Option<&Map<String, Value>> {
    value
        .get("mcpServers")
        .and_then(Value::as_object)
        .or_else(|| {
            value
                .get("mcp")
                .and_then(|mcp| mcp.get("servers"))
                .and_then(Value::as_object)
        })
        .or_else(|| value.get("servers").and_then(Value::as_object))
}

fn arg_to_string(arg: &Value) -> Option<String> {
    match arg {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Lower-confidence candidates from shell snippets, at most one per block
pub fn shell_candidates(readme: &str) -> Vec<CommandCandidate> {
    code_blocks(readme)
        .into_iter()
        .filter(|block| SHELL_FENCE_LANGS.contains(&block.lang.to_lowercase().as_str()))
        .filter_map(|block| first_launch_line(block.body))
        .filter_map(|tokens| CommandCandidate::new(tokens, CandidateSource::ReadmeCodeBlock))
        .collect()
}

fn first_launch_line(body: &str) -> Option<Vec<String>> {
    join_continuations(body)
        .iter()
        .map(|line| line.trim())
        .map(|line| line.strip_prefix("$ ").unwrap_or(line))
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(split_shell_words)
        .map(truncate_at_operator)
        .find(|tokens| is_launch_invocation(tokens))
}

fn join_continuations(body: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for line in body.lines() {
        let trimmed = line.trim_end();
        if let Some(head) = trimmed.strip_suffix('\\') {
            current.push_str(head);
            current.push(' ');
        } else {
            current.push_str(trimmed);
            lines.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn truncate_at_operator(mut tokens: Vec<String>) -> Vec<String> {
    if let Some(pos) = tokens
        .iter()
        .position(|t| SHELL_OPERATORS.contains(&t.as_str()))
    {
        tokens.truncate(pos);
    }
    tokens
}

fn is_launch_invocation(tokens: &[String]) -> bool {
    let (Some(runner), Some(second)) = (tokens.first(), tokens.get(1)) else {
        return false;
    };
    let runner = runner.as_str();
    if !SHELL_RUNNERS.contains(&runner) {
        return false;
    }

    if RUN_SUBCOMMAND_RUNNERS.contains(&runner) {
        return second == "run" && tokens.len() > 2;
    }

    if SETUP_VERBS.contains(&second.as_str()) {
        return false;
    }

    if matches!(runner, "python" | "python3") && second == "-m" {
        return tokens
            .get(2)
            .map(|module| !TOOLING_MODULES.contains(&module.as_str()))
            .unwrap_or(false);
    }

    true
}

/// Splits a command line into words, honouring single quotes, double quotes
/// and backslash escapes. Stops at an unquoted `#`. Returns `None` on an
/// unterminated quote.
pub fn split_shell_words(line: &str) -> Option<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_word = true;
                loop {
                    match chars.next()? {
                        '\'' => break,
                        ch => current.push(ch),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next()? {
                        '"' => break,
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                current.push(escaped);
                            }
                        }
                        ch => current.push(ch),
                    }
                }
            }
            '\\' => {
                in_word = true;
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            '#' if !in_word => break,
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }

    if in_word {
        words.push(current);
    }
    Some(words)
}
