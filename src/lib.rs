//! crisp-bootstrap - idempotent development environment setup for CRISP

pub mod bootstrap;
pub mod config;
pub mod env;
pub mod error;
pub mod exec;
pub mod retry;
pub mod search_path;
pub mod steps;
pub mod utils;

pub use bootstrap::{Bootstrap, BootstrapReport, StepRecord};
pub use config::Config;
pub use env::HostEnv;
pub use error::{BootstrapError, Result};
pub use exec::{ArtifactFetcher, CommandRunner, CommandSpec, HttpFetcher, ProcessRunner};
pub use retry::{retry, Backoff, RetryPolicy};
pub use search_path::SearchPath;
pub use steps::{StepContext, StepOutcome};
