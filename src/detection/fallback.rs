//! Last-resort launch command from well-known file names

use super::types::{CandidateSource, CommandCandidate};
use crate::repository::RepositorySnapshot;

/// Checked in order at the snapshot root
const SERVER_FILENAMES: &[&str] = &["server.py", "main.py", "app.py", "index.js"];

fn interpreter_for(file_name: &str) -> Option<&'static str> {
    if file_name.ends_with(".py") {
        Some("python")
    } else if file_name.ends_with(".js") {
        Some("node")
    } else {
        None
    }
}

/// At most one `fallback-filename` candidate
pub fn fallback_candidate(snapshot: &RepositorySnapshot) -> Option<CommandCandidate> {
    let tokens = well_known_file(snapshot)
        .or_else(|| package_main(snapshot))
        .or_else(|| named_like_server(snapshot))?;
    CommandCandidate::new(tokens, CandidateSource::FallbackFilename)
}

fn well_known_file(snapshot: &RepositorySnapshot) -> Option<Vec<String>> {
    SERVER_FILENAMES
        .iter()
        .find(|name| snapshot.has_root_file(name))
        .and_then(|name| {
            let interpreter = interpreter_for(name)?;
            Some(vec![interpreter.to_string(), (*name).to_string()])
        })
}

/// A root `__main__.py` means the directory itself is a runnable package
fn package_main(snapshot: &RepositorySnapshot) -> Option<Vec<String>> {
    if !snapshot.has_root_file("__main__.py") || snapshot.name().is_empty() {
        return None;
    }
    Some(vec![
        "python".to_string(),
        "-m".to_string(),
        snapshot.name().to_string(),
    ])
}

fn named_like_server(snapshot: &RepositorySnapshot) -> Option<Vec<String>> {
    let mut matches: Vec<&String> = snapshot
        .root_files()
        .iter()
        .filter(|name| name.ends_with(".py"))
        .filter(|name| {
            let lower = name.to_lowercase();
            lower.contains("mcp") || lower.contains("server")
        })
        .collect();
    matches.sort();
    matches
        .first()
        .map(|name| vec!["python".to_string(), (*name).clone()])
}
