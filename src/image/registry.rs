//! Image registry preparation (Amazon ECR via the AWS CLI)

use super::builder::{ImageReference, RegistryCredentials};
use super::error::BuildError;
use crate::aws::{AwsCli, AwsCliError};
use crate::util::BackoffPolicy;
use async_trait::async_trait;
use tracing::info;

/// Namespace used when no repository is configured
pub const DEFAULT_NAMESPACE: &str = "mcp-servers";

const REPOSITORY_NOT_FOUND: &str = "RepositoryNotFoundException";
const ECR_USERNAME: &str = "AWS";

#[async_trait]
pub trait ImageRegistry: Send + Sync {
    /// Registry used when none is configured
    async fn default_registry(&self) -> Result<String, BuildError>;

    /// Makes sure `image` can be pushed and returns push credentials
    async fn prepare(&self, image: &ImageReference) -> Result<RegistryCredentials, BuildError>;
}

pub struct EcrRegistry {
    cli: AwsCli,
    backoff: BackoffPolicy,
}

impl EcrRegistry {
    pub fn new(cli: AwsCli) -> Self {
        Self {
            cli,
            backoff: BackoffPolicy::default(),
        }
    }

    async fn describe_repository(&self, name: &str) -> Result<bool, AwsCliError> {
        let args = vec![
            "ecr".to_string(),
            "describe-repositories".to_string(),
            "--repository-names".to_string(),
            name.to_string(),
        ];
        match self.cli.run_json(&args).await {
            Ok(_) => Ok(true),
            Err(e) if e.code() == Some(REPOSITORY_NOT_FOUND) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn ensure_repository(&self, name: &str) -> Result<(), BuildError> {
        let exists = self
            .backoff
            .retry(
                "describe ECR repository",
                || self.describe_repository(name),
                AwsCliError::is_transient,
            )
            .await?;

        if exists {
            info!(repository = %name, "ECR repository already exists");
            return Ok(());
        }

        info!(repository = %name, "Creating ECR repository");
        let args = vec![
            "ecr".to_string(),
            "create-repository".to_string(),
            "--repository-name".to_string(),
            name.to_string(),
            "--image-scanning-configuration".to_string(),
            "scanOnPush=true".to_string(),
            "--encryption-configuration".to_string(),
            "encryptionType=AES256".to_string(),
        ];
        self.cli.run_json(&args).await?;
        Ok(())
    }

    pub async fn login(&self, registry_host: &str) -> Result<RegistryCredentials, BuildError> {
        let args = vec!["ecr".to_string(), "get-login-password".to_string()];
        let password = self
            .backoff
            .retry("ECR login", || self.cli.run(&args), AwsCliError::is_transient)
            .await?
            .trim()
            .to_string();

        Ok(RegistryCredentials {
            username: ECR_USERNAME.to_string(),
            password,
            server_address: format!("https://{}", registry_host),
        })
    }
}

#[async_trait]
impl ImageRegistry for EcrRegistry {
    /// `<account>.dkr.ecr.<region>.amazonaws.com/mcp-servers` for the caller's account
    async fn default_registry(&self) -> Result<String, BuildError> {
        let account = self
            .backoff
            .retry("resolve account", || self.cli.account_id(), AwsCliError::is_transient)
            .await?;
        Ok(registry_for(&account, self.cli.context().region()))
    }

    async fn prepare(&self, image: &ImageReference) -> Result<RegistryCredentials, BuildError> {
        self.ensure_repository(&image.repository_path()).await?;
        self.login(image.registry_host()).await
    }
}

pub fn registry_for(account_id: &str, region: &str) -> String {
    format!(
        "{}.dkr.ecr.{}.amazonaws.com/{}",
        account_id, region, DEFAULT_NAMESPACE
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_for() {
        assert_eq!(
            registry_for("123456789012", "us-west-2"),
            "123456789012.dkr.ecr.us-west-2.amazonaws.com/mcp-servers"
        );
    }
}
