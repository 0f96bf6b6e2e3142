//! Doctor: read-only environment diagnostics.

use std::path::Path;

use anyhow::Result;
use crisp_bootstrap::config::Config;
use crisp_bootstrap::search_path::SearchPath;
use crisp_bootstrap::steps::catalog;
use crisp_bootstrap::HostEnv;

use super::setup::project_dir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Ok,
    Warn,
    Err,
}

impl Severity {
    pub fn icon(&self) -> &'static str {
        match self {
            Severity::Ok => "[ok]",
            Severity::Warn => "[warn]",
            Severity::Err => "[ERR]",
        }
    }
}

pub struct DiagItem {
    pub severity: Severity,
    pub category: &'static str,
    pub message: String,
}

pub fn run_diagnostics(config: &Config, env: &HostEnv, project: &Path) -> Vec<DiagItem> {
    let mut diags = Vec::new();

    check_config(config, &mut diags);
    check_environment(&env.path, &mut diags);
    check_tools(config, env, &mut diags);
    check_project(config, project, &mut diags);

    diags
}

fn check_config(config: &Config, diags: &mut Vec<DiagItem>) {
    diags.push(DiagItem {
        severity: Severity::Ok,
        category: "config",
        message: "Configuration loaded successfully".into(),
    });

    if config.retry.max_attempts == 1 {
        diags.push(DiagItem {
            severity: Severity::Warn,
            category: "config",
            message: "retry.max_attempts is 1; network failures will not be retried".into(),
        });
    }
}

fn check_environment(path: &SearchPath, diags: &mut Vec<DiagItem>) {
    for binary in &["git", "bash", "sh"] {
        check_binary(path, binary, diags);
    }
}

pub fn check_binary(path: &SearchPath, name: &str, diags: &mut Vec<DiagItem>) {
    match path.resolve(name) {
        Some(found) => diags.push(DiagItem {
            severity: Severity::Ok,
            category: "environment",
            message: format!("{} found at {}", name, found.display()),
        }),
        None => diags.push(DiagItem {
            severity: Severity::Err,
            category: "environment",
            message: format!("{} not found in PATH", name),
        }),
    }
}

fn check_tools(config: &Config, env: &HostEnv, diags: &mut Vec<DiagItem>) {
    for tool in catalog(&config.tools) {
        let status = tool.status(env, &env.path);
        let (severity, message) = match (&status.resolved, status.enabled) {
            (Some(found), _) => (
                Severity::Ok,
                format!("{} ({}) at {}", status.name, status.binary, found.display()),
            ),
            (None, true) => (
                Severity::Warn,
                format!("{} ({}) missing; will be installed", status.name, status.binary),
            ),
            (None, false) => continue,
        };
        diags.push(DiagItem {
            severity,
            category: "tools",
            message,
        });
    }
}

fn check_project(config: &Config, project: &Path, diags: &mut Vec<DiagItem>) {
    let marker = project.join(&config.project.marker);
    let (severity, message) = if marker.exists() {
        (Severity::Ok, format!("Project bootstrapped: {}", project.display()))
    } else {
        (
            Severity::Warn,
            format!(
                "{} missing; template will be cloned from {}",
                marker.display(),
                config.project.template_repo
            ),
        )
    };
    diags.push(DiagItem {
        severity,
        category: "project",
        message,
    });
}

pub(crate) fn cmd_doctor(config: &Config) -> Result<()> {
    let env = HostEnv::from_process()?;
    let project = project_dir(config)?;
    let diags = run_diagnostics(config, &env, &project);

    println!("CRISP Bootstrap Doctor");
    println!("======================");
    println!();

    let mut current_category = "";
    for diag in &diags {
        if diag.category != current_category {
            if !current_category.is_empty() {
                println!();
            }
            current_category = diag.category;
        }
        println!(
            "{:<6} {:<12} {}",
            diag.severity.icon(),
            diag.category,
            diag.message
        );
    }

    println!();
    let errors = diags.iter().filter(|d| d.severity == Severity::Err).count();
    let warnings = diags
        .iter()
        .filter(|d| d.severity == Severity::Warn)
        .count();
    let ok = diags.iter().filter(|d| d.severity == Severity::Ok).count();
    println!("{} ok, {} warnings, {} errors", ok, warnings, errors);

    if warnings > 0 {
        println!();
        println!("Run `crisp-bootstrap` to install missing tools and bootstrap the project.");
    }

    Ok(())
}
