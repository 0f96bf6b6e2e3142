//! Bootstrap steps. Each one checks whether its work is already done and
//! only then touches the network or the filesystem.
//!
//! Steps share a [`StepContext`] holding the mockable runner and fetcher plus
//! the retry policy. The search path is passed in and handed back explicitly.

pub mod packages;
pub mod patch;
pub mod profile;
pub mod project;
pub mod tools;

use serde::Serialize;

use crate::env::HostEnv;
use crate::exec::{ArtifactFetcher, CommandRunner};
use crate::retry::RetryPolicy;

pub use tools::{catalog, InstallMethod, ToolInstaller, ToolSpec};

/// What a step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// The precondition already held; nothing ran.
    AlreadySatisfied,
    /// A tool was installed.
    Installed,
    /// A filesystem or project change was made.
    Applied,
    /// Disabled by configuration.
    Skipped,
}

impl StepOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            StepOutcome::AlreadySatisfied => "already satisfied",
            StepOutcome::Installed => "installed",
            StepOutcome::Applied => "applied",
            StepOutcome::Skipped => "skipped",
        }
    }
}

/// Shared collaborators for every step.
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    pub runner: &'a dyn CommandRunner,
    pub fetcher: &'a dyn ArtifactFetcher,
    pub policy: &'a RetryPolicy,
    pub env: &'a HostEnv,
}
