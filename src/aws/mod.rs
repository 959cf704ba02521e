//! AWS access through the `aws` command-line client

pub mod cli;
pub mod context;

pub use cli::{parse_failure, AwsCli, AwsCliError};
pub use context::{resolve_region, AwsContext, DEFAULT_REGION};
