//! JavaScript dependency installation in the project directory.

use std::path::Path;

use crate::config::PackagesConfig;
use crate::env::HostEnv;
use crate::error::Result;
use crate::exec::CommandSpec;
use crate::log_component;
use crate::retry::run_with_retry;
use crate::search_path::SearchPath;

use super::{StepContext, StepOutcome};

/// Build the install command, adding `--frozen-lockfile` for pnpm under CI.
///
/// The child gets `PNPM_HOME` and `CI` in its environment.
pub fn install_command(config: &PackagesConfig, env: &HostEnv, project_dir: &Path) -> CommandSpec {
    let mut spec = CommandSpec::new(config.manager.as_str())
        .args(config.install_args.iter().map(String::as_str))
        .cwd(project_dir)
        .env(
            "PNPM_HOME",
            env.pnpm_home_or_default().to_string_lossy().into_owned(),
        )
        .env("CI", env.ci.to_string())
        .inherit_stdio();
    if env.ci
        && config.manager == "pnpm"
        && !spec.args.iter().any(|a| a == "--frozen-lockfile")
    {
        spec = spec.arg("--frozen-lockfile");
    }
    spec
}

/// Run the package manager's install in `project_dir`.
///
/// `PNPM_HOME` (or its default) is put in front of the search path so a
/// standalone pnpm install is found.
pub async fn install_packages(
    ctx: StepContext<'_>,
    config: &PackagesConfig,
    project_dir: &Path,
    path: &SearchPath,
) -> Result<(SearchPath, StepOutcome)> {
    let path = path.with_prepended([ctx.env.pnpm_home_or_default()]);
    if !config.enabled {
        return Ok((path, StepOutcome::Skipped));
    }

    let spec = install_command(config, ctx.env, project_dir);
    log_component!(info, "packages", "Installing dependencies", command = spec.display());
    run_with_retry(ctx.runner, ctx.policy, &config.manager, &spec, &path).await?;
    Ok((path, StepOutcome::Applied))
}
