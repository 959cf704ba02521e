use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const STACK_PREFIX: &str = "mcp-server-";

/// Everything the bundled service template needs besides the image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployParameters {
    pub service_name: String,
    pub cluster_name: String,
    pub vpc_id: String,
    pub alb_subnet_ids: Vec<String>,
    pub ecs_subnet_ids: Vec<String>,
    pub port: u16,
    pub cpu: u32,
    pub memory: u32,
    pub certificate_arn: Option<String>,
}

impl DeployParameters {
    pub fn stack_name(&self) -> String {
        stack_name(&self.service_name)
    }

    pub fn has_certificate(&self) -> bool {
        self.certificate_arn
            .as_deref()
            .is_some_and(|arn| !arn.trim().is_empty())
    }

    /// Stack parameters passed to the engine alongside the template
    pub fn to_parameter_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::from([
            ("ServiceName".to_string(), self.service_name.clone()),
            ("VpcId".to_string(), self.vpc_id.clone()),
            ("ALBSubnetIds".to_string(), self.alb_subnet_ids.join(",")),
            ("ECSSubnetIds".to_string(), self.ecs_subnet_ids.join(",")),
        ]);
        if self.has_certificate() {
            if let Some(arn) = &self.certificate_arn {
                map.insert("CertificateArn".to_string(), arn.trim().to_string());
            }
        }
        map
    }

    /// Values substituted into the template text
    pub fn template_values(&self, image_uri: &str) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("service_name", self.service_name.clone()),
            ("cluster_name", self.cluster_name.clone()),
            ("image_uri", image_uri.to_string()),
            ("port", self.port.to_string()),
            ("cpu", self.cpu.to_string()),
            ("memory", self.memory.to_string()),
        ])
    }
}

pub fn stack_name(service_name: &str) -> String {
    format!("{}{}", STACK_PREFIX, service_name)
}
