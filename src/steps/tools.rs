//! Toolchain catalog and the idempotent installer.
//!
//! Every tool follows the same pattern: resolve the binary on the search path
//! (extended with the tool's own bin directories), and only if that fails run
//! its installer through the retry helper, run post-install commands, and
//! re-resolve. A binary that is still missing after a successful install is
//! fatal and never retried.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::ToolsConfig;
use crate::env::HostEnv;
use crate::error::{BootstrapError, Result};
use crate::exec::CommandSpec;
use crate::log_component;
use crate::retry::{retry, run_checked, run_with_retry};
use crate::search_path::SearchPath;

use super::{StepContext, StepOutcome};

/// How a missing tool gets installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallMethod {
    /// Download a shell script over HTTPS and pipe it to `interpreter`.
    RemoteScript { url: String, interpreter: String },
    /// Download a single binary to `dest` (`~` expands to `HOME`).
    Download {
        url: String,
        dest: String,
        sha256: Option<String>,
    },
    /// Run a local command, typically a tool installed by an earlier step.
    Command { argv: Vec<String> },
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSpec {
    pub name: String,
    /// Binary whose presence means the tool is installed.
    pub binary: String,
    pub method: InstallMethod,
    /// Commands run after the installer, e.g. `foundryup`.
    pub post_install: Vec<Vec<String>>,
    /// Directories the installer puts binaries into (`~`-relative).
    pub bin_dirs: Vec<String>,
    pub enabled: bool,
}

fn script(url: &str, interpreter: &str) -> InstallMethod {
    InstallMethod::RemoteScript {
        url: url.to_string(),
        interpreter: interpreter.to_string(),
    }
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

/// Release asset name of the static solc build for this platform.
fn solc_asset() -> &'static str {
    if cfg!(target_os = "macos") {
        "solc-macos"
    } else {
        "solc-static-linux"
    }
}

/// The fixed, ordered CRISP toolchain.
pub fn catalog(config: &ToolsConfig) -> Vec<ToolSpec> {
    let mut tools = vec![
        ToolSpec {
            name: "foundry".to_string(),
            binary: "forge".to_string(),
            method: script("https://foundry.paradigm.xyz", "bash"),
            post_install: vec![argv(&["foundryup"])],
            bin_dirs: vec!["~/.foundry/bin".to_string()],
            enabled: true,
        },
        ToolSpec {
            name: "rzup".to_string(),
            binary: "rzup".to_string(),
            method: script("https://risczero.com/install", "bash"),
            post_install: vec![],
            bin_dirs: vec!["~/.risc0/bin".to_string()],
            enabled: true,
        },
        ToolSpec {
            name: "risc0".to_string(),
            binary: "r0vm".to_string(),
            method: InstallMethod::Command {
                argv: argv(&["rzup", "install"]),
            },
            post_install: vec![],
            bin_dirs: vec!["~/.risc0/bin".to_string()],
            enabled: true,
        },
        ToolSpec {
            name: "noir".to_string(),
            binary: "nargo".to_string(),
            method: script(
                "https://raw.githubusercontent.com/noir-lang/noirup/refs/heads/main/install",
                "bash",
            ),
            post_install: vec![argv(&["noirup"])],
            bin_dirs: vec!["~/.nargo/bin".to_string()],
            enabled: config.install_noir,
        },
        ToolSpec {
            name: "wasm-pack".to_string(),
            binary: "wasm-pack".to_string(),
            method: script("https://rustwasm.github.io/wasm-pack/installer/init.sh", "sh"),
            post_install: vec![],
            bin_dirs: vec!["~/.cargo/bin".to_string()],
            enabled: true,
        },
        ToolSpec {
            name: "solc".to_string(),
            binary: "solc".to_string(),
            method: InstallMethod::Download {
                url: format!(
                    "https://github.com/ethereum/solidity/releases/download/v{}/{}",
                    config.solc_version,
                    solc_asset()
                ),
                dest: "~/.local/bin/solc".to_string(),
                sha256: config.solc_sha256.clone(),
            },
            post_install: vec![],
            bin_dirs: vec!["~/.local/bin".to_string()],
            enabled: true,
        },
        ToolSpec {
            name: "enclave".to_string(),
            binary: "enclave".to_string(),
            method: script(
                "https://raw.githubusercontent.com/gnosisguild/enclave/main/install",
                "bash",
            ),
            post_install: vec![argv(&["enclaveup", "install"])],
            bin_dirs: vec!["~/.local/bin".to_string(), "~/.cargo/bin".to_string()],
            enabled: true,
        },
    ];

    for tool in &mut tools {
        if config.skip.iter().any(|s| s == &tool.name) {
            tool.enabled = false;
        }
    }
    tools
}

/// Result of a read-only presence check.
#[derive(Debug, Clone)]
pub struct ToolStatus {
    pub name: String,
    pub binary: String,
    pub enabled: bool,
    pub resolved: Option<PathBuf>,
}

impl ToolSpec {
    /// `path` with this tool's bin directories in front.
    pub fn search_path(&self, env: &HostEnv, path: &SearchPath) -> SearchPath {
        path.with_prepended(self.bin_dirs.iter().map(|d| env.expand(d)))
    }

    /// Check presence without installing anything.
    pub fn status(&self, env: &HostEnv, path: &SearchPath) -> ToolStatus {
        ToolStatus {
            name: self.name.clone(),
            binary: self.binary.clone(),
            enabled: self.enabled,
            resolved: self.search_path(env, path).resolve(&self.binary),
        }
    }
}

/// Installs catalog tools that are not yet resolvable.
pub struct ToolInstaller<'a> {
    ctx: StepContext<'a>,
}

impl<'a> ToolInstaller<'a> {
    pub fn new(ctx: StepContext<'a>) -> Self {
        Self { ctx }
    }

    /// Make sure `tool` is resolvable, installing it if needed.
    ///
    /// Returns the search path later steps should use.
    pub async fn ensure(
        &self,
        tool: &ToolSpec,
        path: &SearchPath,
    ) -> Result<(SearchPath, StepOutcome)> {
        if !tool.enabled {
            log_component!(info, "tools", "Tool disabled", tool = tool.name.as_str());
            return Ok((path.clone(), StepOutcome::Skipped));
        }

        let extended = tool.search_path(self.ctx.env, path);
        if let Some(found) = extended.resolve(&tool.binary) {
            info!(component = "tools", tool = %tool.name, path = %found.display(), "Already installed");
            return Ok((extended, StepOutcome::AlreadySatisfied));
        }

        log_component!(info, "tools", "Installing", tool = tool.name.as_str());
        self.install(tool, &extended).await?;

        for post in &tool.post_install {
            if let Some(spec) = CommandSpec::from_argv(post) {
                let spec = self.child(spec);
                let label = format!("{} ({})", tool.name, spec.display());
                run_with_retry(self.ctx.runner, self.ctx.policy, &label, &spec, &extended).await?;
            }
        }

        match extended.resolve(&tool.binary) {
            Some(found) => {
                info!(component = "tools", tool = %tool.name, path = %found.display(), "Installed");
                Ok((extended, StepOutcome::Installed))
            }
            None => Err(BootstrapError::NotOnPath {
                binary: tool.binary.clone(),
            }),
        }
    }

    async fn install(&self, tool: &ToolSpec, path: &SearchPath) -> Result<()> {
        let ctx = self.ctx;
        let label = format!("{} installer", tool.name);
        match &tool.method {
            InstallMethod::RemoteScript { url, interpreter } => {
                retry(ctx.policy, &label, |_| async move {
                    let body = ctx.fetcher.fetch(url).await?;
                    let spec = self.child(CommandSpec::new(interpreter.as_str()).stdin(body));
                    run_checked(ctx.runner, &spec, path).await
                })
                .await
            }
            InstallMethod::Download { url, dest, sha256 } => {
                let dest = ctx.env.expand(dest);
                let dest = dest.as_path();
                retry(ctx.policy, &label, |_| async move {
                    let body = ctx.fetcher.fetch(url).await?;
                    if let Some(expected) = sha256 {
                        verify_sha256(url, &body, expected)?;
                    }
                    write_executable(dest, &body)
                })
                .await
            }
            InstallMethod::Command { argv } => {
                let spec = CommandSpec::from_argv(argv).ok_or_else(|| {
                    BootstrapError::Config(format!("{} has an empty install command", tool.name))
                })?;
                let spec = self.child(spec);
                run_with_retry(ctx.runner, ctx.policy, &label, &spec, path).await
            }
        }
    }

    /// Installer children see `HOME` and write to the terminal.
    fn child(&self, spec: CommandSpec) -> CommandSpec {
        spec.env("HOME", self.ctx.env.home.display().to_string())
            .inherit_stdio()
    }
}

fn verify_sha256(url: &str, body: &[u8], expected: &str) -> Result<()> {
    let actual = hex::encode(Sha256::digest(body));
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(BootstrapError::Checksum {
            url: url.to_string(),
            expected: expected.to_string(),
            actual,
        })
    }
}

/// Write `body` to `dest` through a sibling temp file and mark it executable.
fn write_executable(dest: &Path, body: &[u8]) -> Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = dest.with_extension("download");
    std::fs::write(&tmp, body)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o755))?;
    }
    std::fs::rename(&tmp, dest)?;
    Ok(())
}
