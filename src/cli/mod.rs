//! CLI module: command parsing and dispatch
//!
//! All CLI logic lives here. `main.rs` calls `cli::run()`.

pub mod config;
pub mod doctor;
pub mod setup;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crisp_bootstrap::config::Config;
use crisp_bootstrap::error::{BootstrapError, EXIT_FAILURE};

#[derive(Parser)]
#[command(name = "crisp-bootstrap")]
#[command(version)]
#[command(
    about = "Install the CRISP toolchain, bootstrap the project, and start the dev server",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Config file (default: ~/.crisp/bootstrap.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Also install the Noir toolchain
    #[arg(long, global = true)]
    pub with_noir: bool,
    /// Prepare everything but do not start the dev server
    #[arg(long, global = true)]
    pub no_dev_server: bool,
    /// Project directory (default: ./project)
    #[arg(long, global = true, value_name = "DIR")]
    pub project_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Report which tools are installed without changing anything
    Doctor,
    /// Show version information
    Version,
    /// Inspect the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Check configuration for errors and warnings
    Check,
    /// Print the effective configuration as JSON
    Show,
}

impl GlobalArgs {
    /// Config file this invocation reads.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::path)
    }

    /// Load the config file, apply env overrides, then fold in flags.
    pub fn load_config(&self) -> Result<Config> {
        let path = self.config_path();
        if self.config.is_some() && !path.exists() {
            return Err(BootstrapError::Config(format!(
                "config file not found: {}",
                path.display()
            ))
            .into());
        }

        let mut config = Config::load_from_path(&path)?;
        if self.with_noir {
            config.tools.install_noir = true;
        }
        if self.no_dev_server {
            config.dev_server.enabled = false;
        }
        if let Some(dir) = &self.project_dir {
            config.project.dir = dir.to_string_lossy().into_owned();
        }
        config.validate()?;
        Ok(config)
    }
}

/// Entry point for the CLI, called from main().
pub async fn run() -> Result<()> {
    // A local .env may carry CRISP_BOOTSTRAP_* overrides.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            cmd_version();
        }
        Some(Commands::Config { action }) => {
            config::cmd_config(action, &cli.global)?;
        }
        Some(Commands::Doctor) => {
            let config = init(&cli.global)?;
            doctor::cmd_doctor(&config)?;
        }
        None => {
            let config = init(&cli.global)?;
            setup::cmd_bootstrap(config).await?;
        }
    }

    Ok(())
}

/// Load configuration and install the tracing subscriber.
fn init(global: &GlobalArgs) -> Result<Config> {
    let config = global.load_config()?;
    crisp_bootstrap::utils::logging::init_logging(&config.logging)
        .context("Failed to initialize logging")?;
    Ok(config)
}

/// Exit code for a failed run: the bootstrap error's own code when there is one.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|e| e.downcast_ref::<BootstrapError>())
        .map(BootstrapError::exit_code)
        .unwrap_or(EXIT_FAILURE)
}

/// Display version information
fn cmd_version() {
    println!("crisp-bootstrap {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Development environment bootstrapper for the CRISP example project");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["crisp-bootstrap", "doctor", "--with-noir"]).unwrap();
        assert!(cli.global.with_noir);
        assert!(matches!(cli.command, Some(Commands::Doctor)));
    }

    #[test]
    fn test_no_subcommand_runs_bootstrap() {
        let cli = Cli::try_parse_from(["crisp-bootstrap", "--no-dev-server"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.global.no_dev_server);
    }

    #[test]
    fn test_flags_override_config() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("bootstrap.json");
        std::fs::write(&path, r#"{"project": {"dir": "from-file"}}"#).unwrap();

        let global = GlobalArgs {
            config: Some(path),
            with_noir: true,
            no_dev_server: true,
            project_dir: Some(PathBuf::from("/work/crisp")),
        };
        let config = global.load_config().unwrap();
        assert!(config.tools.install_noir);
        assert!(!config.dev_server.enabled);
        assert_eq!(config.project.dir, "/work/crisp");
    }

    #[test]
    fn test_explicit_missing_config_is_error() {
        let global = GlobalArgs {
            config: Some(PathBuf::from("/nonexistent/bootstrap.json")),
            ..Default::default()
        };
        let err = global.load_config().unwrap_err();
        assert_eq!(exit_code(&err), EXIT_FAILURE);
    }

    #[test]
    fn test_exit_code_through_context() {
        let err = anyhow::Error::new(BootstrapError::CommandFailed {
            command: "pnpm dev:all".to_string(),
            code: 130,
        })
        .context("bootstrap failed");
        assert_eq!(exit_code(&err), 130);
        assert_eq!(exit_code(&anyhow::anyhow!("plain")), EXIT_FAILURE);
    }
}
