//! Config command handlers.

use anyhow::{Context, Result};

use crisp_bootstrap::config::validate::{validate_config, DiagnosticLevel};

use super::{ConfigAction, GlobalArgs};

/// Validate or print the configuration file.
pub(crate) fn cmd_config(action: ConfigAction, global: &GlobalArgs) -> Result<()> {
    match action {
        ConfigAction::Check => {
            let config_path = global.config_path();
            println!("Config file: {}", config_path.display());

            if !config_path.exists() {
                println!("[OK] No config file found (using defaults)");
                return Ok(());
            }

            let content =
                std::fs::read_to_string(&config_path).context("Failed to read config file")?;
            if content.trim().is_empty() {
                println!("[OK] Config file is empty (using defaults)");
                return Ok(());
            }

            let raw: serde_json::Value = match serde_json::from_str(&content) {
                Ok(v) => v,
                Err(e) => {
                    println!("[ERROR] Invalid JSON: {}", e);
                    return Ok(());
                }
            };

            let diagnostics = validate_config(&raw);
            for diag in &diagnostics {
                println!("{}", diag);
            }

            // Typed load catches bad values the key check cannot see.
            if let Err(e) = global.load_config() {
                println!("[ERROR] {:#}", e);
            }

            let errors = diagnostics
                .iter()
                .filter(|d| d.level == DiagnosticLevel::Error)
                .count();
            let warnings = diagnostics
                .iter()
                .filter(|d| d.level == DiagnosticLevel::Warn)
                .count();

            if errors == 0 && warnings == 0 {
                println!("\nConfiguration looks good!");
            } else {
                println!("\nFound {} error(s), {} warning(s)", errors, warnings);
            }
        }
        ConfigAction::Show => {
            let config = global.load_config()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }
    Ok(())
}
