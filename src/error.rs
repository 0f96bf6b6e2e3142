//! Error types for crisp-bootstrap
//!
//! This module defines all error types used throughout the bootstrapper.
//! Uses `thiserror` for ergonomic error handling with automatic `Display` and
//! `Error` trait implementations.

use thiserror::Error;

/// Exit code used when a required binary cannot be found or started,
/// mirroring the shell convention for "command not found".
pub const EXIT_NOT_FOUND: i32 = 127;

/// Generic failure exit code.
pub const EXIT_FAILURE: i32 = 1;

/// The primary error type for bootstrap operations.
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// A child process ran to completion with a non-zero status.
    #[error("Command `{command}` exited with code {code}")]
    CommandFailed { command: String, code: i32 },

    /// A child process could not be started at all.
    #[error("Failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A binary is still not resolvable after its installer reported success.
    #[error("`{binary}` is not on the search path after installation")]
    NotOnPath { binary: String },

    /// Fetching a remote installer script or artifact failed.
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// A downloaded artifact did not match its pinned SHA-256.
    #[error("Checksum mismatch for {url}: expected {expected}, got {actual}")]
    Checksum {
        url: String,
        expected: String,
        actual: String,
    },

    /// The downstream script patch could not be applied.
    #[error("Patch error: {0}")]
    Patch(String),

    /// Configuration-related errors (invalid values, unreadable file, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl BootstrapError {
    /// Process exit code the CLI should terminate with for this error.
    ///
    /// Command failures propagate the child's own exit code; "not found"
    /// conditions use 127; everything else is 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            BootstrapError::CommandFailed { code, .. } => {
                if *code == 0 {
                    EXIT_FAILURE
                } else {
                    *code
                }
            }
            BootstrapError::NotOnPath { .. } | BootstrapError::Spawn { .. } => EXIT_NOT_FOUND,
            _ => EXIT_FAILURE,
        }
    }
}

/// A specialized `Result` type for bootstrap operations.
pub type Result<T> = std::result::Result<T, BootstrapError>;
