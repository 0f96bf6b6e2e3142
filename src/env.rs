//! Snapshot of the host environment variables the bootstrapper reads.

use std::path::PathBuf;

use crate::error::{BootstrapError, Result};
use crate::search_path::SearchPath;

/// Values read once from `HOME`, `PATH`, `PNPM_HOME`, and `CI`.
#[derive(Debug, Clone)]
pub struct HostEnv {
    pub home: PathBuf,
    pub path: SearchPath,
    pub pnpm_home: Option<PathBuf>,
    pub ci: bool,
}

impl HostEnv {
    /// Capture the current process environment.
    pub fn from_process() -> Result<Self> {
        let home = std::env::var_os("HOME")
            .filter(|h| !h.is_empty())
            .map(PathBuf::from)
            .or_else(dirs::home_dir)
            .ok_or_else(|| BootstrapError::Config("HOME is not set".to_string()))?;

        let pnpm_home = std::env::var_os("PNPM_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let ci = std::env::var("CI").map(|v| is_truthy(&v)).unwrap_or(false);

        Ok(Self {
            home,
            path: SearchPath::from_env(),
            pnpm_home,
            ci,
        })
    }

    /// `PNPM_HOME` from the host, else pnpm's default `~/.local/share/pnpm`.
    pub fn pnpm_home_or_default(&self) -> PathBuf {
        self.pnpm_home
            .clone()
            .unwrap_or_else(|| self.home.join(".local/share/pnpm"))
    }

    /// Expand a leading `~/` against this environment's home directory.
    pub fn expand(&self, path: &str) -> PathBuf {
        if path == "~" {
            self.home.clone()
        } else if let Some(rest) = path.strip_prefix("~/") {
            self.home.join(rest)
        } else {
            PathBuf::from(path)
        }
    }
}

/// `CI` counts as set for any non-empty value other than `0`/`false`.
fn is_truthy(value: &str) -> bool {
    let v = value.trim();
    !(v.is_empty() || v == "0" || v.eq_ignore_ascii_case("false"))
}
