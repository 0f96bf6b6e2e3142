//! Logging initialization for crisp-bootstrap.
//!
//! Supports three formats:
//! - `pretty`: multi-line human-readable output
//! - `component`: compact single-line output; use the [`log_component!`] macro
//!   to add a `component` field naming the bootstrap step
//! - `json`: structured JSON lines
//!
//! Logs go to stderr (or a file) so they never interleave with the dev server's
//! stdout.

use crate::config::{LogFormat, LoggingConfig};
use crate::error::Result;

/// Initialize the global tracing subscriber from config.
///
/// Call this once at startup before any tracing events are emitted.
/// `RUST_LOG` takes precedence; if unset, `cfg.level` is used.
pub fn init_logging(cfg: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.level));

    let file = match &cfg.file {
        Some(path) => Some(
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?,
        ),
        None => None,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    // try_init so tests and repeated calls do not panic on an existing subscriber.
    let installed = match (cfg.format, file) {
        (LogFormat::Json, Some(file)) => builder
            .json()
            .with_writer(std::sync::Mutex::new(file))
            .try_init(),
        (LogFormat::Json, None) => builder.json().with_writer(std::io::stderr).try_init(),
        (LogFormat::Pretty, Some(file)) => builder
            .pretty()
            .with_writer(std::sync::Mutex::new(file))
            .try_init(),
        (LogFormat::Pretty, None) => builder.pretty().with_writer(std::io::stderr).try_init(),
        (LogFormat::Component, Some(file)) => builder
            .compact()
            .with_target(true)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .try_init(),
        (LogFormat::Component, None) => builder
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init(),
    };
    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
    Ok(())
}

/// Emit a component-tagged tracing event.
///
/// Works with any tracing level (`trace`, `debug`, `info`, `warn`, `error`).
/// The `component` field names the bootstrap step that emitted the event:
///
/// ```
/// # use crisp_bootstrap::log_component;
/// log_component!(info, "tools", "forge already installed");
/// log_component!(warn, "project", "marker missing", dir = "project");
/// ```
#[macro_export]
macro_rules! log_component {
    ($level:ident, $component:expr, $msg:expr) => {
        tracing::$level!(component = $component, $msg)
    };
    ($level:ident, $component:expr, $msg:expr, $($key:ident = $val:expr),+ $(,)?) => {
        tracing::$level!(component = $component, $($key = $val,)+ $msg)
    };
}
