//! Stack template loading and placeholder substitution

use super::error::DeploymentError;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

/// ECS Fargate service behind an application load balancer
pub const BUNDLED_TEMPLATE: &str = include_str!("../../templates/ecs-service.yaml");

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder regex is valid")
    })
}

/// Reads a template from disk, or the bundled one when no path is given
pub fn load(path: Option<&Path>) -> Result<String, DeploymentError> {
    match path {
        Some(path) => std::fs::read_to_string(path).map_err(|e| {
            DeploymentError::Template(format!("failed to read {}: {}", path.display(), e))
        }),
        None => Ok(BUNDLED_TEMPLATE.to_string()),
    }
}

/// Replaces every `{{ key }}` with its value. Unknown keys are an error so a
/// typo never reaches the engine as literal braces.
pub fn render(template: &str, values: &BTreeMap<&str, String>) -> Result<String, DeploymentError> {
    let mut missing = Vec::new();
    let rendered = placeholder_regex().replace_all(template, |caps: &Captures| {
        let key = &caps[1];
        match values.get(key) {
            Some(value) => value.clone(),
            None => {
                missing.push(key.to_string());
                caps[0].to_string()
            }
        }
    });

    if !missing.is_empty() {
        missing.sort();
        missing.dedup();
        return Err(DeploymentError::Template(format!(
            "unknown placeholders: {}",
            missing.join(", ")
        )));
    }
    Ok(rendered.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn values() -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("service_name", "weather".to_string()),
            ("cluster_name", "mcp-cluster".to_string()),
            ("image_uri", "repo/weather:abc".to_string()),
            ("port", "8000".to_string()),
            ("cpu", "256".to_string()),
            ("memory", "512".to_string()),
        ])
    }

    #[test]
    fn test_render_substitutes_with_and_without_spaces() {
        let out = render("image: {{image_uri}}\nport: {{ port }}", &values()).unwrap();
        assert_eq!(out, "image: repo/weather:abc\nport: 8000");
    }

    #[test]
    fn test_render_rejects_unknown_placeholder() {
        let err = render("{{ image_uri }} {{ nope }} {{nope}}", &values()).unwrap_err();
        assert_eq!(err.reason(), "template-error");
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_bundled_template_renders_completely() {
        let out = render(BUNDLED_TEMPLATE, &values()).unwrap();

        assert!(!out.contains("{{"));
        assert!(out.contains("repo/weather:abc"));
        assert!(out.contains("ALBUrl"));
        assert!(out.contains("LoadBalancerDNSName"));
        // cloudformation intrinsics survive
        assert!(out.contains("!Ref ServiceName"));
    }

    #[test]
    fn test_load_custom_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Resources: {{{{ service_name }}}}").unwrap();

        let content = load(Some(file.path())).unwrap();
        assert_eq!(content, "Resources: {{ service_name }}");
        assert_eq!(load(None).unwrap(), BUNDLED_TEMPLATE);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load(Some(Path::new("/nonexistent/template.yaml"))).unwrap_err();
        assert_eq!(err.reason(), "template-error");
    }
}
