//! Shell profile setup: `~/.local/bin` and a one-time PATH export in `~/.bashrc`.

use std::io::Write;
use std::path::PathBuf;

use crate::config::ProfileConfig;
use crate::env::HostEnv;
use crate::error::Result;
use crate::log_component;
use crate::search_path::SearchPath;

use super::StepOutcome;

/// Comment line marking the block this tool appends.
pub const RC_MARKER: &str = "# Added by crisp-bootstrap";

/// Render the `export PATH=...` line, keeping `$HOME` symbolic.
pub fn export_line(bin_dirs: &[String]) -> String {
    let dirs: Vec<String> = bin_dirs
        .iter()
        .map(|d| match d.strip_prefix("~/") {
            Some(rest) => format!("$HOME/{}", rest),
            None => d.clone(),
        })
        .collect();
    format!("export PATH=\"{}:$PATH\"", dirs.join(":"))
}

/// Create `~/.local/bin`, export the bin directories once, and return the
/// search path with those directories in front.
pub fn ensure_profile(
    config: &ProfileConfig,
    env: &HostEnv,
    path: &SearchPath,
) -> Result<(SearchPath, StepOutcome)> {
    std::fs::create_dir_all(env.home.join(".local").join("bin"))?;

    let dirs: Vec<PathBuf> = config.bin_dirs.iter().map(|d| env.expand(d)).collect();
    let extended = path.with_prepended(dirs);

    if !config.update_rc || config.bin_dirs.is_empty() {
        return Ok((extended, StepOutcome::Skipped));
    }

    let rc_path = env.expand(&config.rc_file);
    let existing = match std::fs::read_to_string(&rc_path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    if existing.lines().any(|l| l.trim() == RC_MARKER) {
        log_component!(debug, "profile", "PATH export already present");
        return Ok((extended, StepOutcome::AlreadySatisfied));
    }

    let mut block = String::new();
    if !existing.is_empty() && !existing.ends_with('\n') {
        block.push('\n');
    }
    block.push('\n');
    block.push_str(RC_MARKER);
    block.push('\n');
    block.push_str(&export_line(&config.bin_dirs));
    block.push('\n');

    if let Some(parent) = rc_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&rc_path)?;
    file.write_all(block.as_bytes())?;

    tracing::info!(component = "profile", rc = %rc_path.display(), "Appended PATH export");
    Ok((extended, StepOutcome::Applied))
}
