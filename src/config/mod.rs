//! Configuration management for crisp-bootstrap
//!
//! Configuration is loaded from `~/.crisp/bootstrap.json` (or an explicit path)
//! with environment variable overrides. A missing file yields the defaults.

mod types;
pub mod validate;

pub use types::*;

use crate::error::{BootstrapError, Result};
use std::path::{Path, PathBuf};

impl Config {
    /// Returns the configuration directory path (~/.crisp)
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".crisp")
    }

    /// Returns the path to the config file (~/.crisp/bootstrap.json)
    pub fn path() -> PathBuf {
        Self::dir().join("bootstrap.json")
    }

    /// Load configuration from the default path with environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::path())
    }

    /// Load configuration from a specific path with environment overrides.
    ///
    /// Environment variables follow the pattern `CRISP_BOOTSTRAP_SECTION_KEY`.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            if content.trim().is_empty() {
                Config::default()
            } else {
                serde_json::from_str(&content).map_err(|e| {
                    BootstrapError::Config(format!("{}: {}", path.display(), e))
                })?
            }
        } else {
            Config::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup (the process env in production).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Retry
        if let Some(v) = lookup("CRISP_BOOTSTRAP_RETRY_MAX_ATTEMPTS").and_then(|v| v.parse().ok()) {
            self.retry.max_attempts = v;
        }
        if let Some(v) = lookup("CRISP_BOOTSTRAP_RETRY_DELAY_SECS").and_then(|v| v.parse().ok()) {
            self.retry.delay_secs = v;
        }

        // Tools
        if let Some(v) = lookup("CRISP_BOOTSTRAP_TOOLS_INSTALL_NOIR").and_then(|v| v.parse().ok()) {
            self.tools.install_noir = v;
        }
        if let Some(v) = lookup("CRISP_BOOTSTRAP_TOOLS_SOLC_VERSION") {
            self.tools.solc_version = v;
        }

        // Project
        if let Some(v) = lookup("CRISP_BOOTSTRAP_PROJECT_DIR") {
            self.project.dir = v;
        }
        if let Some(v) = lookup("CRISP_BOOTSTRAP_PROJECT_TEMPLATE_REPO") {
            self.project.template_repo = v;
        }

        // Profile
        if let Some(v) = lookup("CRISP_BOOTSTRAP_PROFILE_UPDATE_RC").and_then(|v| v.parse().ok()) {
            self.profile.update_rc = v;
        }

        // Dev server
        if let Some(v) = lookup("CRISP_BOOTSTRAP_DEV_SERVER_ENABLED").and_then(|v| v.parse().ok()) {
            self.dev_server.enabled = v;
        }

        // Logging
        if let Some(v) = lookup("CRISP_BOOTSTRAP_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = lookup("CRISP_BOOTSTRAP_LOG_FORMAT")
            .and_then(|v| serde_json::from_value(serde_json::Value::String(v)).ok())
        {
            self.logging.format = v;
        }
    }

    /// Reject values the bootstrapper cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(BootstrapError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.project.dir.trim().is_empty() {
            return Err(BootstrapError::Config("project.dir must not be empty".to_string()));
        }
        if self.project.marker.trim().is_empty() {
            return Err(BootstrapError::Config(
                "project.marker must not be empty".to_string(),
            ));
        }
        if self.dev_server.enabled && self.dev_server.command.is_empty() {
            return Err(BootstrapError::Config(
                "dev_server.command must not be empty".to_string(),
            ));
        }
        if self.packages.enabled && self.packages.manager.trim().is_empty() {
            return Err(BootstrapError::Config(
                "packages.manager must not be empty".to_string(),
            ));
        }
        if self.patch.enabled {
            regex::Regex::new(&self.patch.find).map_err(|e| {
                BootstrapError::Config(format!("patch.find is not a valid regex: {}", e))
            })?;
        }
        if let Some(sum) = &self.tools.solc_sha256 {
            if sum.len() != 64 || hex::decode(sum).is_err() {
                return Err(BootstrapError::Config(
                    "tools.solc_sha256 must be 64 hex characters".to_string(),
                ));
            }
        }
        Ok(())
    }
}
