//! Final launch-command selection
//!
//! `resolve` is deterministic in its inputs and never touches the file
//! system or network.

use super::error::DetectionError;
use super::proxy::{proxy_argv, ProxyOptions};
use super::types::{CandidateSource, CommandCandidate, PackageManagerProfile, Transport};
use serde::{Serialize, Serializer};
use tracing::{debug, info};

/// The resolved launch command. The proxy invocation is always derived from
/// these fields, so the fields stay private.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrypointSpec {
    command: String,
    args: Vec<String>,
    options: ProxyOptions,
}

impl EntrypointSpec {
    /// Splits `tokens` into command and arguments. `None` when empty.
    pub fn from_tokens(tokens: &[String], options: ProxyOptions) -> Option<Self> {
        let (command, args) = tokens.split_first()?;
        if command.trim().is_empty() {
            return None;
        }
        Some(Self {
            command: command.clone(),
            args: args.to_vec(),
            options,
        })
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn options(&self) -> ProxyOptions {
        self.options
    }

    pub fn port(&self) -> u16 {
        self.options.port
    }

    pub fn proxy_argv(&self) -> Vec<String> {
        proxy_argv(&self.command, &self.args, self.options)
    }

    pub fn proxy_command(&self) -> String {
        self.proxy_argv().join(" ")
    }
}

impl Serialize for EntrypointSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("EntrypointSpec", 3)?;
        state.serialize_field("command", &self.command)?;
        state.serialize_field("args", &self.args)?;
        state.serialize_field("proxy_command", &self.proxy_command())?;
        state.end()
    }
}

/// Outcome of resolution: the entry point plus how it was chosen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub entrypoint: EntrypointSpec,
    pub transport: Transport,
    /// `None` when an override was used
    pub source: Option<CandidateSource>,
    pub profile: PackageManagerProfile,
}

impl Resolution {
    pub fn is_override(&self) -> bool {
        self.source.is_none()
    }
}

/// Picks the launch command.
///
/// An override wins outright and is treated as `stdio-direct`. Otherwise
/// docker candidates are dropped and the rest are ranked by source, then
/// transport, then discovery order.
pub fn resolve(
    candidates: &[CommandCandidate],
    override_tokens: Option<&[String]>,
    profile: &PackageManagerProfile,
    options: ProxyOptions,
) -> Result<Resolution, DetectionError> {
    if let Some(tokens) = override_tokens {
        let entrypoint =
            EntrypointSpec::from_tokens(tokens, options).ok_or(DetectionError::EmptyOverride)?;
        info!(command = %entrypoint.command(), "Using command override");
        return Ok(Resolution {
            entrypoint,
            transport: Transport::StdioDirect,
            source: None,
            profile: profile.clone(),
        });
    }

    let selected = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.is_docker())
        .min_by_key(|(index, c)| (c.source, c.transport, *index))
        .map(|(_, c)| c);

    let Some(candidate) = selected else {
        return Err(match candidates.iter().find(|c| c.is_docker()) {
            Some(docker) => DetectionError::DockerOnly(docker.tokens.join(" ")),
            None => DetectionError::NoUsableCommand,
        });
    };

    debug!(
        candidate = %candidate,
        considered = candidates.len(),
        "Selected launch command"
    );

    let entrypoint = EntrypointSpec::from_tokens(&candidate.tokens, options)
        .ok_or(DetectionError::NoUsableCommand)?;

    Ok(Resolution {
        entrypoint,
        transport: candidate.transport,
        source: Some(candidate.source),
        profile: profile.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::types::PackageManager;

    fn candidate(tokens: &[&str], source: CandidateSource) -> CommandCandidate {
        CommandCandidate::new(tokens.iter().map(|t| t.to_string()).collect(), source).unwrap()
    }

    fn profile() -> PackageManagerProfile {
        PackageManagerProfile::new(PackageManager::Uv, "uv.lock")
    }

    #[test]
    fn test_uvx_readme_candidate() {
        let candidates = vec![candidate(&["uvx", "my-server"], CandidateSource::ReadmeJson)];
        let resolution =
            resolve(&candidates, None, &profile(), ProxyOptions::default()).unwrap();

        assert_eq!(
            resolution.entrypoint.proxy_command(),
            "mcp-proxy --port 8000 --shell uvx -- my-server"
        );
        assert_eq!(resolution.transport, Transport::Uvx);
        assert_eq!(resolution.source, Some(CandidateSource::ReadmeJson));
        assert_eq!(resolution.profile.manager, PackageManager::Uv);
    }

    #[test]
    fn test_docker_only_fails() {
        let candidates = vec![candidate(
            &["docker", "run", "img"],
            CandidateSource::ReadmeJson,
        )];
        let err = resolve(&candidates, None, &profile(), ProxyOptions::default()).unwrap_err();

        assert_eq!(err.reason(), "docker-only");
        assert!(err.to_string().contains("docker run img"));
    }

    #[test]
    fn test_no_candidates() {
        let err = resolve(&[], None, &profile(), ProxyOptions::default()).unwrap_err();
        assert_eq!(err, DetectionError::NoUsableCommand);
    }

    #[test]
    fn test_docker_is_skipped_even_from_better_source() {
        let candidates = vec![
            candidate(&["docker", "run", "img"], CandidateSource::ReadmeJson),
            candidate(&["python", "server.py"], CandidateSource::FallbackFilename),
        ];
        let resolution =
            resolve(&candidates, None, &profile(), ProxyOptions::default()).unwrap();

        assert_eq!(resolution.entrypoint.command(), "python");
        assert_eq!(resolution.source, Some(CandidateSource::FallbackFilename));
    }

    #[test]
    fn test_source_outranks_transport() {
        let candidates = vec![
            candidate(&["uvx", "from-shell"], CandidateSource::ReadmeCodeBlock),
            candidate(&["weather"], CandidateSource::PyprojectScript),
        ];
        let resolution =
            resolve(&candidates, None, &profile(), ProxyOptions::default()).unwrap();

        assert_eq!(resolution.entrypoint.command(), "weather");
    }

    #[test]
    fn test_transport_breaks_source_ties() {
        let candidates = vec![
            candidate(&["python", "-m", "srv"], CandidateSource::ReadmeJson),
            candidate(&["npx", "srv"], CandidateSource::ReadmeJson),
            candidate(&["uvx", "srv"], CandidateSource::ReadmeJson),
        ];
        let resolution =
            resolve(&candidates, None, &profile(), ProxyOptions::default()).unwrap();

        assert_eq!(resolution.transport, Transport::Uvx);
    }

    #[test]
    fn test_discovery_order_breaks_full_ties() {
        let candidates = vec![
            candidate(&["first"], CandidateSource::PyprojectScript),
            candidate(&["second"], CandidateSource::PyprojectScript),
        ];
        let resolution =
            resolve(&candidates, None, &profile(), ProxyOptions::default()).unwrap();

        assert_eq!(resolution.entrypoint.command(), "first");
    }

    #[test]
    fn test_override_bypasses_candidates() {
        let candidates = vec![candidate(
            &["docker", "run", "img"],
            CandidateSource::ReadmeJson,
        )];
        let tokens = vec!["npx".to_string(), "-y".to_string(), "server".to_string()];
        let resolution = resolve(
            &candidates,
            Some(&tokens),
            &profile(),
            ProxyOptions::new(9000, true),
        )
        .unwrap();

        assert!(resolution.is_override());
        assert_eq!(resolution.transport, Transport::StdioDirect);
        assert_eq!(
            resolution.entrypoint.proxy_command(),
            "mcp-proxy --debug --port 9000 --shell npx -- -y server"
        );
    }

    #[test]
    fn test_empty_override_rejected() {
        let err = resolve(&[], Some(&[]), &profile(), ProxyOptions::default()).unwrap_err();
        assert_eq!(err.reason(), "empty-override");

        let blank = vec![" ".to_string()];
        let err = resolve(&[], Some(&blank), &profile(), ProxyOptions::default()).unwrap_err();
        assert_eq!(err, DetectionError::EmptyOverride);
    }

    #[test]
    fn test_entrypoint_serializes_proxy_command() {
        let spec = EntrypointSpec::from_tokens(
            &["server".to_string()],
            ProxyOptions::default(),
        )
        .unwrap();
        let json = serde_json::to_value(&spec).unwrap();

        assert_eq!(json["command"], "server");
        assert_eq!(json["args"], serde_json::json!([]));
        assert_eq!(json["proxy_command"], "mcp-proxy --port 8000 --shell server");
    }
}
