use serde::{Deserialize, Serialize};
use std::env;

pub const DEFAULT_REGION: &str = "us-east-1";

/// Region and credentials profile for one invocation.
///
/// Passed explicitly to everything that talks to AWS; nothing reads
/// process-wide session state after this is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsContext {
    region: String,
    profile: Option<String>,
}

impl AwsContext {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            profile: None,
        }
    }

    /// Explicit region, then `AWS_REGION`, then `AWS_DEFAULT_REGION`, then us-east-1.
    /// The profile comes from `AWS_PROFILE` when set.
    pub fn resolve(explicit_region: Option<&str>) -> Self {
        let region = resolve_region(explicit_region);
        let profile = env::var("AWS_PROFILE").ok().filter(|p| !p.is_empty());
        Self { region, profile }
    }

    pub fn with_profile(mut self, profile: Option<String>) -> Self {
        self.profile = profile;
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    /// Global CLI flags carrying this context
    pub fn cli_flags(&self) -> Vec<String> {
        let mut flags = vec!["--region".to_string(), self.region.clone()];
        if let Some(profile) = &self.profile {
            flags.push("--profile".to_string());
            flags.push(profile.clone());
        }
        flags
    }
}

pub fn resolve_region(explicit: Option<&str>) -> String {
    explicit
        .filter(|r| !r.trim().is_empty())
        .map(str::to_string)
        .or_else(|| env::var("AWS_REGION").ok().filter(|r| !r.is_empty()))
        .or_else(|| env::var("AWS_DEFAULT_REGION").ok().filter(|r| !r.is_empty()))
        .unwrap_or_else(|| DEFAULT_REGION.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        env::remove_var("AWS_REGION");
        env::remove_var("AWS_DEFAULT_REGION");
        env::remove_var("AWS_PROFILE");
    }

    #[test]
    #[serial]
    fn test_region_precedence() {
        clear_env();
        assert_eq!(resolve_region(None), "us-east-1");

        env::set_var("AWS_DEFAULT_REGION", "eu-west-1");
        assert_eq!(resolve_region(None), "eu-west-1");

        env::set_var("AWS_REGION", "us-west-2");
        assert_eq!(resolve_region(None), "us-west-2");

        assert_eq!(resolve_region(Some("ap-south-1")), "ap-south-1");
        assert_eq!(resolve_region(Some("  ")), "us-west-2");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_profile_from_env() {
        clear_env();
        env::set_var("AWS_PROFILE", "deploy");
        let ctx = AwsContext::resolve(Some("us-west-2"));
        clear_env();

        assert_eq!(ctx.profile(), Some("deploy"));
        assert_eq!(
            ctx.cli_flags(),
            vec!["--region", "us-west-2", "--profile", "deploy"]
        );
    }

    #[test]
    fn test_flags_without_profile() {
        let ctx = AwsContext::new("eu-central-1");
        assert_eq!(ctx.cli_flags(), vec!["--region", "eu-central-1"]);
    }
}
