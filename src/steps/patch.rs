//! One-line rewrite of a downstream script so the dev server binds to all
//! interfaces.

use regex::Regex;
use std::path::Path;

use crate::config::PatchConfig;
use crate::error::{BootstrapError, Result};
use crate::log_component;

use super::StepOutcome;

/// Replace the first match of `find` on the first matching line of `content`.
///
/// Returns `None` when nothing matches.
pub fn patch_first_line(content: &str, find: &Regex, replace: &str) -> Option<String> {
    let mut out = String::with_capacity(content.len() + replace.len());
    let mut patched = false;
    for line in content.split_inclusive('\n') {
        if !patched && find.is_match(line) {
            out.push_str(&find.replacen(line, 1, regex::NoExpand(replace)));
            patched = true;
        } else {
            out.push_str(line);
        }
    }
    patched.then_some(out)
}

/// Apply the configured patch to `<project_dir>/<file>`.
///
/// The file counts as patched only when `find` no longer matches any line
/// and the replacement text is present.
pub fn apply_patch(config: &PatchConfig, project_dir: &Path) -> Result<StepOutcome> {
    if !config.enabled {
        return Ok(StepOutcome::Skipped);
    }

    let file = project_dir.join(&config.file);
    let content = std::fs::read_to_string(&file)
        .map_err(|e| BootstrapError::Patch(format!("cannot read {}: {}", file.display(), e)))?;

    let find = Regex::new(&config.find)
        .map_err(|e| BootstrapError::Config(format!("patch.find: {}", e)))?;
    let patched = match patch_first_line(&content, &find, &config.replace) {
        Some(patched) => patched,
        None if content.contains(config.replace.as_str()) => {
            log_component!(debug, "patch", "Already patched");
            return Ok(StepOutcome::AlreadySatisfied);
        }
        None => {
            return Err(BootstrapError::Patch(format!(
                "`{}` does not match anything in {}",
                config.find,
                file.display()
            )))
        }
    };

    // Writing in place keeps the script's mode bits.
    std::fs::write(&file, patched)?;
    tracing::info!(component = "patch", file = %file.display(), "Patched");
    Ok(StepOutcome::Applied)
}
