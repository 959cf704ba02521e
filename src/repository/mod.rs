//! Fetching repositories and taking snapshots of them

pub mod error;
pub mod github;
pub mod snapshot;

pub use error::RepositoryError;
pub use github::{
    FetchRequest, FetchedRepository, GithubRepo, GithubRepositoryHost, RepositoryHost,
    DEFAULT_BRANCH, NO_COMMIT,
};
pub use snapshot::{RepositorySnapshot, Revision, MANIFEST_FILES, README_FILES};
