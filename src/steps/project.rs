//! Template project materialization.
//!
//! The template repository is cloned (with submodules) into a scratch
//! directory, merged into the project directory without replacing anything
//! that is already there, and then permissions of the merged entries are
//! normalized. The whole
//! step is gated on a marker file: once it exists the step is a no-op.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::ProjectConfig;
use crate::error::Result;
use crate::exec::CommandSpec;
use crate::log_component;
use crate::retry::{retry, run_checked};
use crate::search_path::SearchPath;

use super::{StepContext, StepOutcome};

/// Name of the clone directory inside the scratch dir.
const CLONE_DIR: &str = "template";

/// Entries never copied out of the clone.
const SKIPPED_NAMES: &[&str] = &[".git"];

/// Counts from a merge pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeStats {
    pub copied: usize,
    pub kept: usize,
    /// Topmost files and directories the merge created. A new directory is
    /// listed once, not per entry inside it. Symlinks are not listed.
    pub created: Vec<PathBuf>,
}

/// `git clone` invocation for the template.
pub fn clone_command(config: &ProjectConfig, target: &Path) -> CommandSpec {
    let mut spec = CommandSpec::new("git").args(["clone", "--recurse-submodules"]);
    if let Some(reference) = &config.template_ref {
        spec = spec.args(["--branch", reference.as_str()]);
    }
    spec.arg(config.template_repo.as_str())
        .arg(target.to_string_lossy().into_owned())
        .inherit_stdio()
}

/// Materialize the template into `project_dir` unless the marker is present.
pub async fn ensure_project(
    ctx: StepContext<'_>,
    config: &ProjectConfig,
    project_dir: &Path,
    path: &SearchPath,
) -> Result<StepOutcome> {
    let marker = project_dir.join(&config.marker);
    if marker.exists() {
        info!(component = "project", marker = %marker.display(), "Project already bootstrapped");
        return Ok(StepOutcome::AlreadySatisfied);
    }

    std::fs::create_dir_all(project_dir)?;
    let scratch = tempfile::Builder::new()
        .prefix("crisp-template-")
        .tempdir()?;
    let target = scratch.path().join(CLONE_DIR);
    let spec = clone_command(config, &target);

    let target_ref = target.as_path();
    let spec_ref = &spec;
    retry(ctx.policy, "template clone", |attempt| async move {
        if target_ref.exists() {
            debug!(attempt, "Removing partial clone");
            std::fs::remove_dir_all(target_ref)?;
        }
        run_checked(ctx.runner, spec_ref, path).await
    })
    .await?;

    let stats = merge_no_overwrite(&target, project_dir)?;
    scratch.close()?;
    log_component!(
        info,
        "project",
        "Merged template",
        copied = stats.copied,
        kept = stats.kept
    );

    if config.normalize_permissions {
        for created in &stats.created {
            normalize_permissions(created)?;
        }
    }

    if !marker.exists() {
        warn!(
            component = "project",
            marker = %marker.display(),
            "Marker still missing after merge; the next run will clone again"
        );
    }
    Ok(StepOutcome::Applied)
}

/// Copy everything under `src` into `dest`, leaving existing entries alone.
pub fn merge_no_overwrite(src: &Path, dest: &Path) -> Result<MergeStats> {
    let mut stats = MergeStats::default();
    merge_dir(src, dest, &mut stats, true)?;
    Ok(stats)
}

fn merge_dir(src: &Path, dest: &Path, stats: &mut MergeStats, record: bool) -> Result<()> {
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let name = entry.file_name();
        if SKIPPED_NAMES.iter().any(|s| name == *s) {
            continue;
        }
        let from = entry.path();
        let to = dest.join(&name);
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            // A symlink to a directory is an existing entry, not a merge target.
            match to.symlink_metadata() {
                Ok(meta) if !meta.is_dir() => stats.kept += 1,
                Ok(_) => merge_dir(&from, &to, stats, record)?,
                Err(_) => {
                    merge_dir(&from, &to, stats, false)?;
                    if record {
                        stats.created.push(to);
                    }
                }
            }
        } else if to.symlink_metadata().is_ok() {
            stats.kept += 1;
        } else if file_type.is_symlink() {
            copy_symlink(&from, &to)?;
            stats.copied += 1;
        } else {
            std::fs::copy(&from, &to)?;
            stats.copied += 1;
            if record {
                stats.created.push(to);
            }
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> Result<()> {
    let link = std::fs::read_link(from)?;
    std::os::unix::fs::symlink(link, to)?;
    Ok(())
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> Result<()> {
    std::fs::copy(from, to)?;
    Ok(())
}

/// Directories become 0755; files become 0755 when any execute bit was set
/// and 0644 otherwise. `root` may be a file or a directory tree. Symlinks
/// are not followed and `.git` is left alone.
#[cfg(unix)]
pub fn normalize_permissions(root: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let meta = root.symlink_metadata()?;
    if meta.is_file() {
        return normalize_file(root, meta.permissions().mode());
    }
    if !meta.is_dir() {
        return Ok(());
    }

    let mut stack: Vec<PathBuf> = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o755))?;
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if SKIPPED_NAMES.iter().any(|s| entry.file_name() == *s) {
                continue;
            }
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                stack.push(entry.path());
            } else if file_type.is_file() {
                normalize_file(&entry.path(), entry.metadata()?.permissions().mode())?;
            }
        }
    }
    Ok(())
}

#[cfg(unix)]
fn normalize_file(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let normalized = if mode & 0o111 != 0 { 0o755 } else { 0o644 };
    if mode & 0o777 != normalized {
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(normalized))?;
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn normalize_permissions(_root: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::HostEnv;
    use crate::error::BootstrapError;
    use crate::exec::mock::{MockFetcher, MockRunner};
    use crate::retry::RetryPolicy;
    use std::time::Duration;

    fn host(home: &Path) -> HostEnv {
        HostEnv {
            home: home.to_path_buf(),
            path: SearchPath::default(),
            pnpm_home: None,
            ci: false,
        }
    }

    #[test]
    fn test_clone_command() {
        let config = ProjectConfig::default();
        let spec = clone_command(&config, Path::new("/tmp/x/template"));
        assert_eq!(
            spec.display(),
            "git clone --recurse-submodules https://github.com/gnosisguild/enclave.git /tmp/x/template"
        );
        assert!(spec.inherit_stdio);

        let pinned = ProjectConfig {
            template_ref: Some("v0.1.0".to_string()),
            ..Default::default()
        };
        let spec = clone_command(&pinned, Path::new("/t"));
        assert!(spec.display().contains("--branch v0.1.0"));
    }

    #[tokio::test]
    async fn test_bootstrap_then_idempotent() {
        let temp = tempfile::tempdir().unwrap();
        let project = temp.path().join("project");
        std::fs::create_dir_all(&project).unwrap();
        std::fs::write(project.join("README.md"), "mine").unwrap();

        let runner = MockRunner::new().populates(
            "git clone",
            &[
                ("package.json", "{}"),
                ("README.md", "theirs"),
                ("examples/CRISP/scripts/dev.sh", "echo localhost"),
                (".git/HEAD", "ref: refs/heads/main"),
            ],
        );
        let fetcher = MockFetcher::new();
        let policy = RetryPolicy::fixed(3, Duration::ZERO);
        let env = host(temp.path());
        let ctx = StepContext {
            runner: &runner,
            fetcher: &fetcher,
            policy: &policy,
            env: &env,
        };
        let config = ProjectConfig::default();

        let first = ensure_project(ctx, &config, &project, &SearchPath::default())
            .await
            .unwrap();
        assert_eq!(first, StepOutcome::Applied);
        assert!(project.join("package.json").exists());
        assert!(project.join("examples/CRISP/scripts/dev.sh").exists());
        assert!(!project.join(".git").exists());
        assert_eq!(std::fs::read_to_string(project.join("README.md")).unwrap(), "mine");

        std::fs::write(project.join("package.json"), "{\"edited\":true}").unwrap();
        let second = ensure_project(ctx, &config, &project, &SearchPath::default())
            .await
            .unwrap();
        assert_eq!(second, StepOutcome::AlreadySatisfied);
        assert_eq!(runner.count_matching("git clone"), 1);
        assert_eq!(
            std::fs::read_to_string(project.join("package.json")).unwrap(),
            "{\"edited\":true}"
        );
        assert_eq!(fetcher.call_count(), 0);
    }

    #[tokio::test]
    async fn test_clone_retries_then_fails() {
        let temp = tempfile::tempdir().unwrap();
        let project = temp.path().join("project");
        let runner = MockRunner::new().always_fail("git clone", 128);
        let fetcher = MockFetcher::new();
        let policy = RetryPolicy::fixed(3, Duration::ZERO);
        let env = host(temp.path());
        let ctx = StepContext {
            runner: &runner,
            fetcher: &fetcher,
            policy: &policy,
            env: &env,
        };

        let err = ensure_project(ctx, &ProjectConfig::default(), &project, &SearchPath::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BootstrapError::CommandFailed { code: 128, .. }));
        assert_eq!(runner.count_matching("git clone"), 3);
        assert!(!project.join("package.json").exists());
    }

    #[test]
    fn test_merge_keeps_existing() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("src");
        let dest = temp.path().join("dest");
        std::fs::create_dir_all(src.join("a/b")).unwrap();
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(src.join("a/b/new.txt"), "new").unwrap();
        std::fs::write(src.join("top.txt"), "theirs").unwrap();
        std::fs::write(dest.join("top.txt"), "mine").unwrap();

        let stats = merge_no_overwrite(&src, &dest).unwrap();
        assert_eq!(stats.copied, 1);
        assert_eq!(stats.kept, 1);
        assert_eq!(stats.created, vec![dest.join("a")]);
        assert_eq!(std::fs::read_to_string(dest.join("top.txt")).unwrap(), "mine");
        assert_eq!(std::fs::read_to_string(dest.join("a/b/new.txt")).unwrap(), "new");
    }

    #[cfg(unix)]
    #[test]
    fn test_merge_copies_symlinks() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("src");
        let dest = temp.path().join("dest");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("target.txt"), "x").unwrap();
        std::os::unix::fs::symlink("target.txt", src.join("link")).unwrap();

        merge_no_overwrite(&src, &dest).unwrap();
        let link = std::fs::read_link(dest.join("link")).unwrap();
        assert_eq!(link, PathBuf::from("target.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn test_merge_keeps_symlinked_directory() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("src");
        let dest = temp.path().join("dest");
        let elsewhere = temp.path().join("elsewhere");
        std::fs::create_dir_all(src.join("contracts")).unwrap();
        std::fs::create_dir_all(&elsewhere).unwrap();
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(src.join("contracts/Vote.sol"), "contract Vote {}").unwrap();
        std::os::unix::fs::symlink(&elsewhere, dest.join("contracts")).unwrap();

        let stats = merge_no_overwrite(&src, &dest).unwrap();
        assert_eq!(stats.kept, 1);
        assert_eq!(stats.copied, 0);
        assert!(!elsewhere.join("Vote.sol").exists());
        assert!(dest.join("contracts").symlink_metadata().unwrap().file_type().is_symlink());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_existing_file_modes_survive_bootstrap() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().unwrap();
        let project = temp.path().join("project");
        std::fs::create_dir_all(&project).unwrap();
        let secret = project.join(".env.local");
        std::fs::write(&secret, "KEY=1").unwrap();
        std::fs::set_permissions(&secret, std::fs::Permissions::from_mode(0o600)).unwrap();

        let runner = MockRunner::new().populates(
            "git clone",
            &[
                ("package.json", "{}"),
                ("examples/CRISP/scripts/dev.sh", "echo localhost"),
            ],
        );
        let fetcher = MockFetcher::new();
        let policy = RetryPolicy::fixed(3, Duration::ZERO);
        let env = host(temp.path());
        let ctx = StepContext {
            runner: &runner,
            fetcher: &fetcher,
            policy: &policy,
            env: &env,
        };

        ensure_project(ctx, &ProjectConfig::default(), &project, &SearchPath::default())
            .await
            .unwrap();

        let mode = |p: &Path| std::fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&secret), 0o600);
        assert_eq!(mode(&project.join("package.json")), 0o644);
        assert_eq!(mode(&project.join("examples/CRISP")), 0o755);
    }

    #[cfg(unix)]
    #[test]
    fn test_normalize_single_file() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("deploy.sh");
        std::fs::write(&file, "#!/bin/sh").unwrap();
        std::fs::set_permissions(&file, std::fs::Permissions::from_mode(0o700)).unwrap();

        normalize_permissions(&file).unwrap();
        let mode = std::fs::metadata(&file).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o755);
    }

    #[cfg(unix)]
    #[test]
    fn test_normalize_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        std::fs::create_dir_all(root.join("scripts")).unwrap();
        std::fs::write(root.join("scripts/run.sh"), "#!/bin/sh").unwrap();
        std::fs::write(root.join("notes.txt"), "n").unwrap();
        std::fs::set_permissions(
            root.join("scripts/run.sh"),
            std::fs::Permissions::from_mode(0o700),
        )
        .unwrap();
        std::fs::set_permissions(root.join("notes.txt"), std::fs::Permissions::from_mode(0o600))
            .unwrap();

        normalize_permissions(root).unwrap();

        let mode = |p: &Path| std::fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&root.join("scripts/run.sh")), 0o755);
        assert_eq!(mode(&root.join("notes.txt")), 0o644);
        assert_eq!(mode(&root.join("scripts")), 0o755);
    }
}
