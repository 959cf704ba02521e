//! Entry points declared in Python packaging manifests

use super::types::{CandidateSource, CommandCandidate};
use regex::Regex;
use std::sync::OnceLock;
use toml::Value;
use tracing::debug;

/// Script tables of a pyproject, in the order they are consulted
const PYPROJECT_SCRIPT_TABLES: &[&[&str]] = &[
    &["project", "scripts"],
    &["project", "entry-points", "console_scripts"],
    &["tool", "poetry", "scripts"],
];

/// One `pyproject-script` candidate per declared console script.
///
/// Unparseable TOML yields no candidates; ManifestScanner still classifies
/// such a file from its raw text.
pub fn pyproject_candidates(content: &str) -> Vec<CommandCandidate> {
    let parsed: Value = match toml::from_str(content) {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, "pyproject.toml did not parse, skipping scripts");
            return Vec::new();
        }
    };

    let mut names: Vec<String> = Vec::new();
    for path in PYPROJECT_SCRIPT_TABLES {
        let Some(table) = lookup(&parsed, path).and_then(Value::as_table) else {
            continue;
        };
        for name in table.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
    }

    names
        .into_iter()
        .filter_map(|name| CommandCandidate::new(vec![name], CandidateSource::PyprojectScript))
        .collect()
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

fn console_scripts_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)console_scripts['"]?\s*[:=]\s*\[(.*?)\]"#)
            .expect("console_scripts regex is valid")
    })
}

fn script_entry_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"["']\s*([A-Za-z0-9_.\-]+)\s*=\s*[A-Za-z0-9_.]+(?::[A-Za-z0-9_.]+)?\s*["']"#)
            .expect("script entry regex is valid")
    })
}

/// One `setup-py-entrypoint` candidate per `console_scripts` entry.
///
/// setup.py is code, so this is a textual scan of the `entry_points`
/// argument rather than an evaluation.
pub fn setup_py_candidates(content: &str) -> Vec<CommandCandidate> {
    let Some(list) = console_scripts_regex()
        .captures(content)
        .and_then(|caps| caps.get(1))
    else {
        return Vec::new();
    };

    script_entry_regex()
        .captures_iter(list.as_str())
        .filter_map(|caps| caps.get(1))
        .filter_map(|name| {
            CommandCandidate::new(
                vec![name.as_str().to_string()],
                CandidateSource::SetupPyEntrypoint,
            )
        })
        .collect()
}
