//! Configuration type definitions for crisp-bootstrap
//!
//! All types implement serde traits for JSON serialization and have sensible
//! defaults, so an absent or partial config file is always valid.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::retry::{Backoff, RetryPolicy};

/// Main configuration struct for crisp-bootstrap
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Retry policy shared by every installer and network step
    pub retry: RetryConfig,
    /// Toolchain selection and pins
    pub tools: ToolsConfig,
    /// Shell profile PATH export
    pub profile: ProfileConfig,
    /// Template project materialization
    pub project: ProjectConfig,
    /// Package-manager dependency install
    pub packages: PackagesConfig,
    /// Downstream one-line script patch
    pub patch: PatchConfig,
    /// Development server launch
    pub dev_server: DevServerConfig,
    /// HTTP client settings
    pub http: HttpConfig,
    /// Logging output
    pub logging: LoggingConfig,
}

// ============================================================================
// Retry Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per step, including the first.
    pub max_attempts: u32,
    /// Seconds to wait between attempts.
    pub delay_secs: u64,
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_secs: 5,
            backoff: Backoff::Fixed,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            delay: Duration::from_secs(self.delay_secs),
            backoff: self.backoff,
        }
    }
}

// ============================================================================
// Tools Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Install the Noir toolchain (`noirup` / `nargo`).
    pub install_noir: bool,
    /// Solidity compiler release to download.
    pub solc_version: String,
    /// Optional SHA-256 (hex) the solc download must match.
    pub solc_sha256: Option<String>,
    /// Tool names to leave alone even when missing.
    pub skip: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            install_noir: false,
            solc_version: "0.8.28".to_string(),
            solc_sha256: None,
            skip: Vec::new(),
        }
    }
}

// ============================================================================
// Profile Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Append a PATH export to the rc file.
    pub update_rc: bool,
    /// Shell rc file, `~` expands to `HOME`.
    pub rc_file: String,
    /// Directories exported (and searched) ahead of the inherited PATH.
    pub bin_dirs: Vec<String>,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            update_rc: true,
            rc_file: "~/.bashrc".to_string(),
            bin_dirs: vec![
                "~/.local/bin".to_string(),
                "~/.foundry/bin".to_string(),
                "~/.risc0/bin".to_string(),
                "~/.nargo/bin".to_string(),
            ],
        }
    }
}

// ============================================================================
// Project Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Working project directory, relative to the current directory.
    pub dir: String,
    /// File inside `dir` whose presence means the template is materialized.
    pub marker: String,
    /// Git remote cloned as the template.
    pub template_repo: String,
    /// Optional branch or tag to clone.
    pub template_ref: Option<String>,
    /// Reset file modes after merging the template.
    pub normalize_permissions: bool,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            dir: "project".to_string(),
            marker: "package.json".to_string(),
            template_repo: "https://github.com/gnosisguild/enclave.git".to_string(),
            template_ref: None,
            normalize_permissions: true,
        }
    }
}

// ============================================================================
// Packages Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagesConfig {
    pub enabled: bool,
    /// Package manager binary.
    pub manager: String,
    /// Arguments passed to the package manager.
    pub install_args: Vec<String>,
}

impl Default for PackagesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            manager: "pnpm".to_string(),
            install_args: vec!["install".to_string()],
        }
    }
}

// ============================================================================
// Patch Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchConfig {
    pub enabled: bool,
    /// Target file, relative to the project directory.
    pub file: String,
    /// Regex matched against a single line.
    pub find: String,
    /// Replacement text, inserted literally.
    pub replace: String,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file: "examples/CRISP/scripts/dev.sh".to_string(),
            find: r"\blocalhost\b".to_string(),
            replace: "0.0.0.0".to_string(),
        }
    }
}

// ============================================================================
// Dev Server Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DevServerConfig {
    pub enabled: bool,
    /// Directory the server runs in, relative to the project directory.
    pub dir: String,
    /// argv of the dev server command.
    pub command: Vec<String>,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: "examples/CRISP".to_string(),
            command: vec!["pnpm".to_string(), "dev:all".to_string()],
        }
    }
}

// ============================================================================
// HTTP Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout for installer downloads.
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 120 }
    }
}

// ============================================================================
// Logging Configuration
// ============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Multi-line human-readable output.
    Pretty,
    /// Compact single-line output with a `component` field per step.
    #[default]
    Component,
    /// JSON lines.
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Optional file to append logs to instead of stderr.
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Component,
            level: "warn".to_string(),
            file: None,
        }
    }
}
