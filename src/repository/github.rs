//! GitHub repository host
//!
//! Downloads the branch tarball from codeload, unpacks it into a temporary
//! directory and resolves the commit SHA through the REST API.

use super::error::RepositoryError;
use super::snapshot::{RepositorySnapshot, Revision};
use crate::fs::RealFileSystem;
use crate::util::BackoffPolicy;
use async_trait::async_trait;
use bytes::Bytes;
use flate2::read::GzDecoder;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info, warn};

pub const DEFAULT_BRANCH: &str = "main";

/// Short SHA used when the commit cannot be resolved
pub const NO_COMMIT: &str = "nocommit";

const SHORT_SHA_LEN: usize = 8;
const GITHUB_PREFIX: &str = "https://github.com/";
const CODELOAD_BASE: &str = "https://codeload.github.com";
const API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("mcpdock/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Owner and name of a GitHub repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubRepo {
    pub owner: String,
    pub repo: String,
}

impl GithubRepo {
    /// Accepts `https://github.com/<owner>/<repo>`, with an optional `.git`
    /// suffix or trailing slash
    pub fn parse(url: &str) -> Result<Self, RepositoryError> {
        let trimmed = url.trim().trim_end_matches('/');
        let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);

        let path = trimmed
            .strip_prefix(GITHUB_PREFIX)
            .ok_or_else(|| RepositoryError::InvalidUrl(url.to_string()))?;

        let parts: Vec<&str> = path.split('/').collect();
        match parts.as_slice() {
            [owner, repo] if !owner.is_empty() && !repo.is_empty() => Ok(Self {
                owner: (*owner).to_string(),
                repo: (*repo).to_string(),
            }),
            _ => Err(RepositoryError::InvalidUrl(url.to_string())),
        }
    }

    pub fn name(&self) -> &str {
        &self.repo
    }
}

/// What to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub branch: Option<String>,
    pub subfolder: Option<String>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            branch: None,
            subfolder: None,
        }
    }

    pub fn with_branch(mut self, branch: Option<String>) -> Self {
        self.branch = branch;
        self
    }

    pub fn with_subfolder(mut self, subfolder: Option<String>) -> Self {
        self.subfolder = subfolder;
        self
    }
}

/// A fetched checkout. The files live as long as this value.
#[derive(Debug)]
pub struct FetchedRepository {
    snapshot: RepositorySnapshot,
    _workdir: TempDir,
}

impl FetchedRepository {
    pub fn new(snapshot: RepositorySnapshot, workdir: TempDir) -> Self {
        Self {
            snapshot,
            _workdir: workdir,
        }
    }

    pub fn snapshot(&self) -> &RepositorySnapshot {
        &self.snapshot
    }

    /// Directory holding the server sources (the subfolder, when one was asked for)
    pub fn source_dir(&self) -> &Path {
        self.snapshot.root()
    }
}

#[async_trait]
pub trait RepositoryHost: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedRepository, RepositoryError>;
}

#[derive(Deserialize)]
struct CommitResponse {
    sha: String,
}

pub struct GithubRepositoryHost {
    http: Client,
    archive_base: String,
    api_base: String,
    token: Option<String>,
    backoff: BackoffPolicy,
}

impl GithubRepositoryHost {
    /// Client against github.com; `GITHUB_TOKEN` is sent when set
    pub fn new() -> Result<Self, RepositoryError> {
        Self::with_endpoints(CODELOAD_BASE, API_BASE, std::env::var("GITHUB_TOKEN").ok())
    }

    pub fn with_endpoints(
        archive_base: impl Into<String>,
        api_base: impl Into<String>,
        token: Option<String>,
    ) -> Result<Self, RepositoryError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            archive_base: archive_base.into(),
            api_base: api_base.into(),
            token,
            backoff: BackoffPolicy::default(),
        })
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.http.get(url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn download_once(&self, url: &str) -> Result<Bytes, RepositoryError> {
        let response = self.get(url).send().await?;
        check_status(response.status(), url)?;
        Ok(response.bytes().await?)
    }

    async fn download_archive(
        &self,
        repo: &GithubRepo,
        branch: &str,
    ) -> Result<Bytes, RepositoryError> {
        let url = format!(
            "{}/{}/{}/tar.gz/refs/heads/{}",
            self.archive_base, repo.owner, repo.repo, branch
        );
        info!(url = %url, "Downloading repository archive");

        self.backoff
            .retry(
                "download repository archive",
                || self.download_once(&url),
                RepositoryError::is_transient,
            )
            .await
    }

    async fn commit_once(&self, url: &str) -> Result<String, RepositoryError> {
        let response = self
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;
        check_status(response.status(), url)?;
        let commit: CommitResponse = response.json().await?;
        Ok(commit.sha)
    }

    /// Short commit SHA of `git_ref`, or [`NO_COMMIT`] on any failure
    pub async fn resolve_commit(&self, repo: &GithubRepo, git_ref: Option<&str>) -> String {
        let url = format!(
            "{}/repos/{}/{}/commits/{}",
            self.api_base,
            repo.owner,
            repo.repo,
            git_ref.unwrap_or("HEAD")
        );

        let result = self
            .backoff
            .retry(
                "resolve commit",
                || self.commit_once(&url),
                RepositoryError::is_transient,
            )
            .await;

        match result {
            Ok(sha) => short_sha(&sha),
            Err(e) => {
                warn!(error = %e, "Could not resolve commit, tagging as {}", NO_COMMIT);
                NO_COMMIT.to_string()
            }
        }
    }
}

#[async_trait]
impl RepositoryHost for GithubRepositoryHost {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedRepository, RepositoryError> {
        let repo = GithubRepo::parse(&request.url)?;
        let branch = request.branch.as_deref().unwrap_or(DEFAULT_BRANCH);

        let archive = self.download_archive(&repo, branch).await?;
        debug!(bytes = archive.len(), "Archive downloaded");

        let workdir = TempDir::new()?;
        let dest = workdir.path().to_path_buf();
        let repo_dir = tokio::task::spawn_blocking(move || unpack_archive(&archive, &dest))
            .await
            .map_err(|e| RepositoryError::Archive(e.to_string()))??;

        let source_dir = apply_subfolder(&repo_dir, request.subfolder.as_deref())?;

        let commit = self
            .resolve_commit(&repo, request.branch.as_deref())
            .await;

        let snapshot = RepositorySnapshot::load(&RealFileSystem, &source_dir)
            .map_err(|e| RepositoryError::Archive(format!("{:#}", e)))?
            .with_revision(Revision::new(commit, request.branch.clone()));

        info!(
            repo = %repo.repo,
            commit = %snapshot.revision().map(|r| r.commit_sha.as_str()).unwrap_or(NO_COMMIT),
            path = %source_dir.display(),
            "Repository fetched"
        );

        Ok(FetchedRepository::new(snapshot, workdir))
    }
}

fn check_status(status: StatusCode, url: &str) -> Result<(), RepositoryError> {
    match status {
        s if s.is_success() => Ok(()),
        StatusCode::NOT_FOUND => Err(RepositoryError::NotFound(url.to_string())),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(RepositoryError::AuthRequired(url.to_string()))
        }
        s if s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS => Err(
            RepositoryError::Network(format!("HTTP {} from {}", s, url)),
        ),
        s => Err(RepositoryError::NotFound(format!("HTTP {} from {}", s, url))),
    }
}

pub fn short_sha(sha: &str) -> String {
    sha.chars().take(SHORT_SHA_LEN).collect()
}

/// Unpacks a `.tar.gz` into `dest` and returns its single top-level directory
pub fn unpack_archive(data: &[u8], dest: &Path) -> Result<PathBuf, RepositoryError> {
    let mut archive = tar::Archive::new(GzDecoder::new(data));
    archive
        .unpack(dest)
        .map_err(|e| RepositoryError::Archive(e.to_string()))?;

    let mut dirs: Vec<PathBuf> = std::fs::read_dir(dest)?
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|entry| entry.path())
        .filter(|path| path.file_name().is_some_and(|n| n != "__pycache__"))
        .collect();
    dirs.sort();

    dirs.into_iter()
        .next()
        .ok_or_else(|| RepositoryError::Archive("archive contains no directory".to_string()))
}

fn apply_subfolder(repo_dir: &Path, subfolder: Option<&str>) -> Result<PathBuf, RepositoryError> {
    let Some(subfolder) = subfolder.map(|s| s.trim_matches('/')).filter(|s| !s.is_empty()) else {
        return Ok(repo_dir.to_path_buf());
    };

    let relative = Path::new(subfolder);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(RepositoryError::SubfolderNotFound(subfolder.to_string()));
    }

    let path = repo_dir.join(relative);
    if path.is_dir() {
        Ok(path)
    } else {
        Err(RepositoryError::SubfolderNotFound(subfolder.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use yare::parameterized;

    fn tarball(files: &[(&str, &str)]) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (path, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, path, content.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[parameterized(
        plain = { "https://github.com/awslabs/mcp", "awslabs", "mcp" },
        dot_git = { "https://github.com/awslabs/mcp.git", "awslabs", "mcp" },
        trailing_slash = { "https://github.com/awslabs/mcp/", "awslabs", "mcp" },
    )]
    fn test_parse_valid(url: &str, owner: &str, repo: &str) {
        let parsed = GithubRepo::parse(url).unwrap();
        assert_eq!(parsed.owner, owner);
        assert_eq!(parsed.repo, repo);
    }

    #[parameterized(
        other_host = { "https://gitlab.com/a/b" },
        http_scheme = { "http://github.com/a/b" },
        too_deep = { "https://github.com/a/b/tree/main" },
        owner_only = { "https://github.com/a" },
    )]
    fn test_parse_invalid(url: &str) {
        let err = GithubRepo::parse(url).unwrap_err();
        assert_eq!(err.reason(), "invalid-url");
    }

    #[parameterized(
        not_found = { 404, "not-found" },
        unauthorized = { 401, "auth-required" },
        forbidden = { 403, "auth-required" },
        server_error = { 502, "network-error" },
        throttled = { 429, "network-error" },
    )]
    fn test_status_classification(code: u16, reason: &str) {
        let status = StatusCode::from_u16(code).unwrap();
        let err = check_status(status, "https://example.test").unwrap_err();
        assert_eq!(err.reason(), reason);
    }

    #[test]
    fn test_short_sha() {
        assert_eq!(short_sha("0123456789abcdef"), "01234567");
        assert_eq!(short_sha("abc"), "abc");
    }

    #[test]
    fn test_unpack_finds_top_level_dir_and_subfolder() {
        let data = tarball(&[
            ("mcp-main/README.md", "# Servers"),
            ("mcp-main/src/weather/server.py", "print('hi')"),
            ("mcp-main/src/weather/requirements.txt", "mcp"),
        ]);
        let dest = TempDir::new().unwrap();

        let repo_dir = unpack_archive(&data, dest.path()).unwrap();
        assert_eq!(repo_dir.file_name().unwrap(), "mcp-main");

        let source = apply_subfolder(&repo_dir, Some("src/weather/")).unwrap();
        assert!(source.join("server.py").is_file());

        let snapshot = RepositorySnapshot::load(&RealFileSystem, &source).unwrap();
        assert_eq!(snapshot.name(), "weather");
        assert!(snapshot.has_manifest("requirements.txt"));
    }

    #[test]
    fn test_missing_or_escaping_subfolder() {
        let dest = TempDir::new().unwrap();
        std::fs::create_dir_all(dest.path().join("repo")).unwrap();
        let repo_dir = dest.path().join("repo");

        let err = apply_subfolder(&repo_dir, Some("nope")).unwrap_err();
        assert_eq!(err.reason(), "subfolder-not-found");

        let err = apply_subfolder(&repo_dir, Some("../repo")).unwrap_err();
        assert_eq!(err.reason(), "subfolder-not-found");

        assert_eq!(apply_subfolder(&repo_dir, None).unwrap(), repo_dir);
    }

    #[test]
    fn test_garbage_archive() {
        let dest = TempDir::new().unwrap();
        let err = unpack_archive(b"not a tarball", dest.path()).unwrap_err();
        assert_eq!(err.reason(), "archive-error");
    }
}
