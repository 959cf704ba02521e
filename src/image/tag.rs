//! Image tags derived from repository state
//!
//! `<short_sha>-<ref>-<YYYYMMDD-HHMMSS>`, UTC. The ref part is sanitized to
//! registry tag characters and is the only part ever shortened.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Registry limit on tag length
pub const MAX_TAG_LEN: usize = 128;

const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";
const SHORT_SHA_LEN: usize = 8;
const UNKNOWN_SHA: &str = "nocommit";

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always reports the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageTag {
    value: String,
}

impl ImageTag {
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for ImageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

pub struct TagGenerator {
    clock: Arc<dyn Clock>,
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl TagGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn generate(&self, commit_sha: &str, ref_name: Option<&str>) -> ImageTag {
        generate(commit_sha, ref_name, self.clock.as_ref())
    }
}

/// Builds the tag. Without a usable ref the tag is `<short_sha>-<timestamp>`.
pub fn generate(commit_sha: &str, ref_name: Option<&str>, clock: &dyn Clock) -> ImageTag {
    let sha = short_sha(commit_sha);
    let timestamp = clock.now().format(TIMESTAMP_FORMAT).to_string();

    // Room left for the ref once sha, timestamp and both dashes are placed
    let budget = MAX_TAG_LEN.saturating_sub(sha.len() + timestamp.len() + 2);
    let ref_part = ref_name
        .map(sanitize_ref)
        .map(|r| truncate_ref(&r, budget))
        .filter(|r| !r.is_empty());

    let value = match ref_part {
        Some(r) => format!("{}-{}-{}", sha, r, timestamp),
        None => format!("{}-{}", sha, timestamp),
    };
    ImageTag { value }
}

fn short_sha(commit_sha: &str) -> String {
    let sha: String = commit_sha
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(SHORT_SHA_LEN)
        .collect::<String>()
        .to_lowercase();
    if sha.is_empty() {
        UNKNOWN_SHA.to_string()
    } else {
        sha
    }
}

/// Collapses every run of non-alphanumeric characters to a single `-`
pub fn sanitize_ref(ref_name: &str) -> String {
    let mut out = String::with_capacity(ref_name.len());
    let mut pending_dash = false;
    for c in ref_name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }
    out
}

fn truncate_ref(sanitized: &str, budget: usize) -> String {
    if sanitized.len() <= budget {
        return sanitized.to_string();
    }
    // Sanitized refs are ASCII, so byte slicing is safe
    sanitized[..budget].trim_end_matches('-').to_string()
}
