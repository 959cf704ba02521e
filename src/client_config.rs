//! Client-facing connection descriptor for a deployed server

use crate::deploy::{DeploymentError, DeploymentResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::path::Path;
use tracing::info;
use url::Url;

pub const PRIMARY_URL_OUTPUT: &str = "ALBUrl";
pub const DNS_NAME_OUTPUT: &str = "LoadBalancerDNSName";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Sse,
    Http,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sse => "sse",
            Self::Http => "http",
        }
    }

    /// Well-known path the proxy serves this transport on
    pub fn path(&self) -> &'static str {
        match self {
            Self::Sse => "sse",
            Self::Http => "mcp",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub server_name: String,
    pub transport: TransportKind,
    pub url: String,
    pub description: Option<String>,
}

impl ClientConfig {
    /// `{"mcpServers": {"<name>": {"type", "url", "description"?}}}`
    pub fn to_json(&self) -> Value {
        let mut entry = json!({
            "type": self.transport.as_str(),
            "url": self.url,
        });
        if let (Some(description), Some(map)) = (&self.description, entry.as_object_mut()) {
            map.insert("description".to_string(), json!(description));
        }
        let mut servers = Map::new();
        servers.insert(self.server_name.clone(), entry);
        json!({ "mcpServers": servers })
    }

    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.to_json()).unwrap_or_else(|_| "{}".to_string())
    }

    /// Writes pretty JSON, creating parent directories as needed
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_pretty_json() + "\n")?;
        info!(path = %path.display(), "Saved client configuration");
        Ok(())
    }
}

impl Serialize for ClientConfig {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

pub struct ClientConfigEmitter {
    server_name: String,
    description: Option<String>,
    secure_default: bool,
}

impl ClientConfigEmitter {
    pub fn new(server_name: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            description: None,
            secure_default: false,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|d| !d.trim().is_empty());
        self
    }

    /// Scheme-less outputs get `https` when the stack was given a certificate
    pub fn with_certificate(mut self, has_certificate: bool) -> Self {
        self.secure_default = has_certificate;
        self
    }

    pub fn emit(
        &self,
        result: &DeploymentResult,
        transport: TransportKind,
    ) -> Result<ClientConfig, DeploymentError> {
        let base = result
            .outputs
            .get(PRIMARY_URL_OUTPUT)
            .or_else(|| result.outputs.get(DNS_NAME_OUTPUT))
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| DeploymentError::MissingOutput {
                stack: result.stack_name.clone(),
                key: PRIMARY_URL_OUTPUT.to_string(),
            })?;

        let url = endpoint_url(base, transport, self.secure_default).ok_or_else(|| {
            DeploymentError::MissingOutput {
                stack: result.stack_name.clone(),
                key: format!("{} (unparseable: {})", PRIMARY_URL_OUTPUT, base),
            }
        })?;

        Ok(ClientConfig {
            server_name: self.server_name.clone(),
            transport,
            url,
            description: self.description.clone(),
        })
    }
}

/// Joins the transport path onto a load balancer address. Path segments
/// already present are kept and percent-encoded.
pub fn endpoint_url(base: &str, transport: TransportKind, secure_default: bool) -> Option<String> {
    let base = base.trim();
    let with_scheme = if base.contains("://") {
        base.to_string()
    } else {
        let scheme = if secure_default { "https" } else { "http" };
        format!("{}://{}", scheme, base)
    };

    let mut url = Url::parse(&with_scheme).ok()?;
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .push(transport.path());
    Some(url.to_string())
}

/// Markdown guide printed after a successful deployment
pub fn setup_instructions(config: &ClientConfig) -> String {
    let sse = ClientConfig {
        transport: TransportKind::Sse,
        url: swap_transport(&config.url, config.transport, TransportKind::Sse),
        ..config.clone()
    };
    let http = ClientConfig {
        transport: TransportKind::Http,
        url: swap_transport(&config.url, config.transport, TransportKind::Http),
        ..config.clone()
    };

    format!(
        r#"# MCP Server Setup

Server '{name}' is deployed and reachable at {base}

## Client configuration

Clients that speak HTTP+SSE:
```json
{sse}
```

Clients that speak Streamable HTTP:
```json
{http}
```

## Testing the connection

```bash
npx @modelcontextprotocol/inspector --cli {http_url} --method tools/list
```

## Troubleshooting

1. Connection issues
   - Check the endpoint answers: `curl -v {http_url}`
   - Check security groups and firewalls between you and the load balancer
2. Server issues
   - Check the ECS service health and task status
   - Read the service logs in CloudWatch
"#,
        name = config.server_name,
        base = base_of(&config.url, config.transport),
        sse = sse.to_pretty_json(),
        http = http.to_pretty_json(),
        http_url = http.url,
    )
}

fn base_of(url: &str, transport: TransportKind) -> &str {
    url.strip_suffix(transport.path())
        .map(|s| s.trim_end_matches('/'))
        .unwrap_or(url)
}

fn swap_transport(url: &str, from: TransportKind, to: TransportKind) -> String {
    format!("{}/{}", base_of(url, from), to.path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::StackStatus;
    use std::collections::BTreeMap;
    use yare::parameterized;

    fn result(outputs: &[(&str, &str)]) -> DeploymentResult {
        DeploymentResult {
            stack_name: "mcp-server-weather".into(),
            status: StackStatus::CreateComplete,
            outputs: outputs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[parameterized(
        with_scheme = { "http://alb.example.com", TransportKind::Sse, false, "http://alb.example.com/sse" },
        trailing_slash = { "https://alb.example.com/", TransportKind::Http, false, "https://alb.example.com/mcp" },
        bare_host = { "alb.example.com", TransportKind::Sse, false, "http://alb.example.com/sse" },
        bare_host_with_cert = { "alb.example.com", TransportKind::Http, true, "https://alb.example.com/mcp" },
        existing_path = { "http://alb.example.com/team a/", TransportKind::Sse, false, "http://alb.example.com/team%20a/sse" },
    )]
    fn test_endpoint_url(base: &str, transport: TransportKind, secure: bool, expected: &str) {
        assert_eq!(endpoint_url(base, transport, secure).as_deref(), Some(expected));
    }

    #[test]
    fn test_emit_prefers_alb_url() {
        let config = ClientConfigEmitter::new("weather")
            .emit(
                &result(&[
                    ("ALBUrl", "http://alb.example.com"),
                    ("LoadBalancerDNSName", "other.example.com"),
                ]),
                TransportKind::Sse,
            )
            .unwrap();

        assert_eq!(config.url, "http://alb.example.com/sse");
        assert_eq!(
            config.to_json(),
            json!({"mcpServers": {"weather": {"type": "sse", "url": "http://alb.example.com/sse"}}})
        );
    }

    #[test]
    fn test_emit_falls_back_to_dns_name() {
        let config = ClientConfigEmitter::new("weather")
            .with_certificate(true)
            .with_description(Some("Weather tools".into()))
            .emit(
                &result(&[("LoadBalancerDNSName", "lb-1.elb.amazonaws.com")]),
                TransportKind::Http,
            )
            .unwrap();

        assert_eq!(config.url, "https://lb-1.elb.amazonaws.com/mcp");
        assert_eq!(config.to_json()["mcpServers"]["weather"]["description"], "Weather tools");
    }

    #[test]
    fn test_emit_without_outputs() {
        let err = ClientConfigEmitter::new("weather")
            .emit(&result(&[]), TransportKind::Sse)
            .unwrap_err();
        assert_eq!(err.reason(), "missing-output");
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("configs/nested/weather.json");
        let config = ClientConfig {
            server_name: "weather".into(),
            transport: TransportKind::Sse,
            url: "http://alb/sse".into(),
            description: None,
        };

        config.save(&path).unwrap();

        let saved: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved, config.to_json());
    }

    #[test]
    fn test_setup_instructions_show_both_transports() {
        let config = ClientConfig {
            server_name: "weather".into(),
            transport: TransportKind::Sse,
            url: "http://alb.example.com/sse".into(),
            description: None,
        };
        let text = setup_instructions(&config);

        assert!(text.contains("reachable at http://alb.example.com\n"));
        assert!(text.contains("\"url\": \"http://alb.example.com/sse\""));
        assert!(text.contains("\"url\": \"http://alb.example.com/mcp\""));
        assert!(text.contains("--cli http://alb.example.com/mcp"));
    }
}
