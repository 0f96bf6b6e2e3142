//! The default command: run the whole bootstrap.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crisp_bootstrap::utils::console;
use crisp_bootstrap::{Bootstrap, Config, HostEnv, HttpFetcher, ProcessRunner};

/// Resolve `project.dir` against the current directory.
pub(crate) fn project_dir(config: &Config) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    Ok(cwd.join(&config.project.dir))
}

pub(crate) async fn cmd_bootstrap(config: Config) -> Result<()> {
    let env = HostEnv::from_process()?;
    let project_dir = project_dir(&config)?;
    let fetcher = HttpFetcher::new(Duration::from_secs(config.http.timeout_secs))?;

    let bootstrap = Bootstrap::new(
        config,
        env,
        project_dir,
        Arc::new(ProcessRunner),
        Arc::new(fetcher),
    );
    let report = bootstrap.run().await?;

    let summary = serde_json::to_string(&report)?;
    debug!(report = %summary, "Bootstrap finished");
    if !report.dev_server_launched {
        console::success(&format!(
            "Environment ready in {}",
            bootstrap.project_dir().display()
        ));
    }
    Ok(())
}
