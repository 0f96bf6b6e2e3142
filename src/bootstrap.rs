//! The bootstrap sequence.
//!
//! Steps run strictly in order, each receiving the search path produced by
//! the previous one. The first error aborts the run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::config::Config;
use crate::env::HostEnv;
use crate::error::{BootstrapError, Result};
use crate::exec::{ArtifactFetcher, CommandRunner, CommandSpec};
use crate::retry::RetryPolicy;
use crate::search_path::SearchPath;
use crate::steps::{self, StepContext, StepOutcome, ToolInstaller};
use crate::utils::console;

/// Timing and outcome of one step.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub name: String,
    pub outcome: StepOutcome,
    pub elapsed_ms: u64,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct BootstrapReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub steps: Vec<StepRecord>,
    /// Final search path handed to the dev server.
    pub search_path: Vec<PathBuf>,
    pub dev_server_launched: bool,
}

impl BootstrapReport {
    pub fn outcome(&self, name: &str) -> Option<StepOutcome> {
        self.steps.iter().find(|s| s.name == name).map(|s| s.outcome)
    }
}

/// Runs every step against one project directory.
pub struct Bootstrap {
    config: Config,
    env: HostEnv,
    project_dir: PathBuf,
    policy: RetryPolicy,
    runner: Arc<dyn CommandRunner>,
    fetcher: Arc<dyn ArtifactFetcher>,
}

impl Bootstrap {
    pub fn new(
        config: Config,
        env: HostEnv,
        project_dir: PathBuf,
        runner: Arc<dyn CommandRunner>,
        fetcher: Arc<dyn ArtifactFetcher>,
    ) -> Self {
        let policy = config.retry.policy();
        Self {
            config,
            env,
            project_dir,
            policy,
            runner,
            fetcher,
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    fn context(&self) -> StepContext<'_> {
        StepContext {
            runner: self.runner.as_ref(),
            fetcher: self.fetcher.as_ref(),
            policy: &self.policy,
            env: &self.env,
        }
    }

    /// The dev server invocation, or `None` when disabled.
    pub fn dev_server_command(&self) -> Result<Option<CommandSpec>> {
        let server = &self.config.dev_server;
        if !server.enabled {
            return Ok(None);
        }
        let spec = CommandSpec::from_argv(&server.command)
            .ok_or_else(|| BootstrapError::Config("dev_server.command is empty".to_string()))?;
        Ok(Some(
            spec.cwd(self.project_dir.join(&server.dir)).inherit_stdio(),
        ))
    }

    pub async fn run(&self) -> Result<BootstrapReport> {
        let started_at = Utc::now();
        let ctx = self.context();
        let mut records = Vec::new();

        let profile = &self.config.profile;
        let env = &self.env;
        let mut path = timed(&mut records, "profile", "Configuring shell profile", async {
            steps::profile::ensure_profile(profile, env, &env.path)
        })
        .await?;

        let installer = ToolInstaller::new(ctx);
        for tool in steps::catalog(&self.config.tools) {
            let current = path.clone();
            let installer = &installer;
            let tool_ref = &tool;
            let message = format!("Checking {}", tool.name);
            path = timed(&mut records, &tool.name, &message, async move {
                installer.ensure(tool_ref, &current).await
            })
            .await?;
        }

        let project_dir = self.project_dir.as_path();
        let current = &path;
        timed(&mut records, "project", "Bootstrapping project", async move {
            let outcome =
                steps::project::ensure_project(ctx, &self.config.project, project_dir, current)
                    .await?;
            Ok((current.clone(), outcome))
        })
        .await?;

        let current = path.clone();
        path = timed(&mut records, "packages", "Installing packages", async move {
            steps::packages::install_packages(ctx, &self.config.packages, project_dir, &current)
                .await
        })
        .await?;

        let current = &path;
        timed(&mut records, "patch", "Patching dev script", async move {
            let outcome = steps::patch::apply_patch(&self.config.patch, project_dir)?;
            Ok((current.clone(), outcome))
        })
        .await?;

        let dev_server_launched = match self.dev_server_command()? {
            Some(spec) => {
                console::step(&format!("Starting dev server: {}", spec.display()));
                info!(component = "bootstrap", command = %spec.display(), "Launching dev server");
                let code = self.runner.run(&spec, &path).await?;
                if code != 0 {
                    return Err(BootstrapError::CommandFailed {
                        command: spec.display(),
                        code,
                    });
                }
                true
            }
            None => {
                console::skipped("dev server");
                false
            }
        };

        Ok(BootstrapReport {
            started_at,
            finished_at: Utc::now(),
            steps: records,
            search_path: path.dirs().to_vec(),
            dev_server_launched,
        })
    }
}

/// Run one step, print its outcome, and record how long it took.
async fn timed<F>(
    records: &mut Vec<StepRecord>,
    name: &str,
    message: &str,
    step: F,
) -> Result<SearchPath>
where
    F: Future<Output = Result<(SearchPath, StepOutcome)>>,
{
    console::step(message);
    let start = Instant::now();
    let (path, outcome) = step.await?;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    match outcome {
        StepOutcome::Skipped => console::skipped(name),
        other => console::success(&format!("{}: {}", name, other.label())),
    }
    info!(
        component = "bootstrap",
        step = name,
        outcome = outcome.label(),
        elapsed_ms,
        "Step finished"
    );
    records.push(StepRecord {
        name: name.to_string(),
        outcome,
        elapsed_ms,
    });
    Ok(path)
}
