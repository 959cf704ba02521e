//! Shared helpers: logging setup and retry backoff

pub mod backoff;
pub mod logging;

pub use backoff::BackoffPolicy;
pub use logging::{init_default, init_from_env, init_logging, LoggingConfig};
