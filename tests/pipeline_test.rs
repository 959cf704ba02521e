//! End-to-end pipeline runs with every outside boundary stubbed

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use mcpdock::config::McpdockConfig;
use mcpdock::deploy::{MockStackEngine, StackDescription};
use mcpdock::fs::RealFileSystem;
use mcpdock::image::{
    BuildError, BuiltImage, ContainerBuilder, FixedClock, ImageReference, ImageRegistry,
    PushedImage, RegistryCredentials,
};
use mcpdock::pipeline::{Pipeline, PipelineContext, PipelineError};
use mcpdock::repository::{
    FetchRequest, FetchedRepository, RepositoryError, RepositoryHost, RepositorySnapshot,
    Revision,
};
use mcpdock::TransportKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const REGISTRY: &str = "123456789012.dkr.ecr.us-east-1.amazonaws.com/mcp-servers";

/// Serves a fixed set of files as the fetched repository
struct StubHost {
    files: Vec<(&'static str, &'static str)>,
}

#[async_trait]
impl RepositoryHost for StubHost {
    async fn fetch(&self, _request: &FetchRequest) -> Result<FetchedRepository, RepositoryError> {
        let workdir = TempDir::new().unwrap();
        let root = workdir.path().join("weather-mcp");
        std::fs::create_dir_all(&root).unwrap();
        for (name, content) in &self.files {
            std::fs::write(root.join(name), content).unwrap();
        }
        let snapshot = RepositorySnapshot::load(&RealFileSystem, &root)
            .unwrap()
            .with_revision(Revision::new(
                "a1b2c3d4e5f60718",
                Some("main".to_string()),
            ));
        Ok(FetchedRepository::new(snapshot, workdir))
    }
}

#[derive(Default)]
struct RecordingBuilder {
    builds: Mutex<Vec<(PathBuf, String, String)>>,
    pushes: Mutex<Vec<String>>,
}

impl RecordingBuilder {
    fn build_count(&self) -> usize {
        self.builds.lock().unwrap().len()
    }

    fn dockerfile(&self) -> String {
        self.builds.lock().unwrap()[0].1.clone()
    }
}

#[async_trait]
impl ContainerBuilder for RecordingBuilder {
    async fn build(
        &self,
        source_dir: &Path,
        dockerfile: &str,
        image: &ImageReference,
    ) -> Result<BuiltImage, BuildError> {
        self.builds.lock().unwrap().push((
            source_dir.to_path_buf(),
            dockerfile.to_string(),
            image.to_string(),
        ));
        Ok(BuiltImage {
            reference: image.clone(),
            image_id: Some("sha256:feed".to_string()),
        })
    }

    async fn push(
        &self,
        image: &ImageReference,
        _credentials: &RegistryCredentials,
    ) -> Result<PushedImage, BuildError> {
        self.pushes.lock().unwrap().push(image.to_string());
        Ok(PushedImage {
            reference: image.clone(),
        })
    }
}

struct StubRegistry;

#[async_trait]
impl ImageRegistry for StubRegistry {
    async fn default_registry(&self) -> Result<String, BuildError> {
        Ok(REGISTRY.to_string())
    }

    async fn prepare(&self, image: &ImageReference) -> Result<RegistryCredentials, BuildError> {
        Ok(RegistryCredentials {
            username: "AWS".to_string(),
            password: "token".to_string(),
            server_address: image.registry_host().to_string(),
        })
    }
}

const UVX_README: &str = "# Weather\n\n```json\n{\"mcpServers\":{\"weather\":{\"command\":\"uvx\",\"args\":[\"weather-mcp\"]}}}\n```\n";
const DOCKER_README: &str = "# Weather\n\n```json\n{\"mcpServers\":{\"weather\":{\"command\":\"docker\",\"args\":[\"run\",\"-i\",\"weather\"]}}}\n```\n";

fn deploy_config(save_to: &Path) -> McpdockConfig {
    let yaml = format!(
        r#"
build:
  github_url: https://github.com/acme/weather-mcp
  push_to_ecr: true
deploy:
  enabled: true
  service_name: weather
  cluster_name: mcp-cluster
  vpc_id: vpc-0abc
  alb_subnet_ids: subnet-a,subnet-b
  ecs_subnet_ids: [subnet-c]
  save_config: {}
"#,
        save_to.display()
    );
    McpdockConfig::from_yaml(&yaml).unwrap()
}

fn context(
    files: Vec<(&'static str, &'static str)>,
    builder: &Arc<RecordingBuilder>,
    engine: &Arc<MockStackEngine>,
) -> PipelineContext {
    let clock = FixedClock(Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap());
    PipelineContext::new(Arc::new(StubHost { files }), builder.clone())
        .with_registry(Arc::new(StubRegistry))
        .with_engine(engine.clone())
        .with_clock(Arc::new(clock))
}

#[tokio::test(start_paused = true)]
async fn test_full_run_emits_client_config() {
    let out = TempDir::new().unwrap();
    let save_to = out.path().join("clients").join("weather.json");
    let config = deploy_config(&save_to);

    let builder = Arc::new(RecordingBuilder::default());
    let engine = Arc::new(MockStackEngine::new());
    engine
        .push_absent()
        .push_status("CREATE_IN_PROGRESS")
        .push_description(
            StackDescription::new("CREATE_COMPLETE")
                .with_output("ALBUrl", "http://weather-alb-1.us-east-1.elb.amazonaws.com"),
        );

    let pipeline = Pipeline::new(context(vec![("README.md", UVX_README)], &builder, &engine));
    let outcome = pipeline.run(&config).await.unwrap();

    assert!(outcome.pushed);
    assert_eq!(
        outcome.detection.entrypoint().proxy_command(),
        "mcp-proxy --port 8000 --shell uvx -- weather-mcp"
    );
    assert!(outcome.image.to_string().starts_with(REGISTRY));
    assert!(outcome.image.tag().value().starts_with("a1b2c3d4-main-20260314-150926"));

    assert_eq!(builder.build_count(), 1);
    assert!(builder.dockerfile().contains("mcp-proxy"));
    assert_eq!(builder.pushes.lock().unwrap().len(), 1);
    assert_eq!(engine.create_calls(), 1);

    let client = outcome.client_config.unwrap();
    assert_eq!(client.transport, TransportKind::Sse);
    assert_eq!(
        client.url,
        "http://weather-alb-1.us-east-1.elb.amazonaws.com/sse"
    );

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&save_to).unwrap()).unwrap();
    assert_eq!(
        saved["mcpServers"]["weather"]["url"],
        "http://weather-alb-1.us-east-1.elb.amazonaws.com/sse"
    );
}

#[tokio::test(start_paused = true)]
async fn test_detection_failure_stops_before_build() {
    let out = TempDir::new().unwrap();
    let config = deploy_config(&out.path().join("weather.json"));

    let builder = Arc::new(RecordingBuilder::default());
    let engine = Arc::new(MockStackEngine::new());

    let pipeline = Pipeline::new(context(
        vec![("README.md", DOCKER_README)],
        &builder,
        &engine,
    ));
    let err = pipeline.run(&config).await.unwrap_err();

    assert!(matches!(err, PipelineError::Detection(_)));
    assert_eq!(err.reason(), "docker-only");
    assert_eq!(builder.build_count(), 0);
    assert!(engine.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_local_build_skips_push_and_deploy() {
    let config = McpdockConfig::from_yaml(
        "build:\n  github_url: https://github.com/acme/weather-mcp\n",
    )
    .unwrap();

    let builder = Arc::new(RecordingBuilder::default());
    let engine = Arc::new(MockStackEngine::new());

    let pipeline = Pipeline::new(context(
        vec![("requirements.txt", "mcp\n"), ("server.py", "import mcp\n")],
        &builder,
        &engine,
    ));
    let outcome = pipeline.run(&config).await.unwrap();

    assert!(!outcome.pushed);
    assert!(outcome.deployment.is_none());
    assert!(outcome.client_config.is_none());
    assert!(outcome.image.to_string().starts_with("mcp-local/"));
    assert!(builder
        .dockerfile()
        .contains("RUN pip install --no-cache-dir -r requirements.txt"));
    assert!(builder.pushes.lock().unwrap().is_empty());
    assert!(engine.calls().is_empty());
}
