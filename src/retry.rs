//! Retry helper with a fixed (or optionally exponential) delay.
//!
//! Every failure is treated the same way: the operation is re-run until it
//! succeeds or the attempt budget is spent, and the last error is returned
//! unchanged so its exit code reaches the caller.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use crisp_bootstrap::retry::{retry, RetryPolicy};
//! use crisp_bootstrap::{ArtifactFetcher, HttpFetcher, Result};
//!
//! async fn foundry_installer(fetcher: &HttpFetcher) -> Result<Vec<u8>> {
//!     let policy = RetryPolicy::fixed(3, Duration::from_secs(5));
//!     retry(&policy, "foundry installer", |_attempt| async move {
//!         fetcher.fetch("https://foundry.paradigm.xyz").await
//!     })
//!     .await
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::{BootstrapError, Result};
use crate::exec::{CommandRunner, CommandSpec};
use crate::search_path::SearchPath;
use crate::utils::console;

/// Delay growth between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Backoff {
    /// The same delay before every retry.
    #[default]
    Fixed,
    /// `delay * 2^(retry - 1)`, capped at `max_delay_secs`.
    Exponential { max_delay_secs: u64 },
}

/// How many times to run an operation and how long to wait in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Values below 1 are treated as 1.
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(5))
    }
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            backoff: Backoff::Fixed,
        }
    }

    /// Attempt budget, never less than one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to sleep after the given failed attempt (1-indexed).
    pub fn delay_for(&self, failed_attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential { max_delay_secs } => {
                let shift = failed_attempt.saturating_sub(1).min(16);
                let grown = self.delay.saturating_mul(1u32 << shift);
                grown.min(Duration::from_secs(max_delay_secs))
            }
        }
    }
}

/// Run `op` until it succeeds or the policy's attempts are exhausted.
///
/// `op` receives the 1-indexed attempt number.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.attempts();
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= attempts => return Err(err),
            Err(err) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    label,
                    attempt,
                    max_attempts = attempts,
                    delay_secs = delay.as_secs_f64(),
                    error = %err,
                    "Attempt failed, retrying"
                );
                console::retrying(label, attempt, attempts, delay);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Run a command through `runner`, retrying non-zero exits and spawn failures.
pub async fn run_with_retry(
    runner: &dyn CommandRunner,
    policy: &RetryPolicy,
    label: &str,
    spec: &CommandSpec,
    path: &SearchPath,
) -> Result<()> {
    retry(policy, label, |_| async move { run_checked(runner, spec, path).await }).await
}

/// Run a command once, turning a non-zero exit into [`BootstrapError::CommandFailed`].
pub async fn run_checked(
    runner: &dyn CommandRunner,
    spec: &CommandSpec,
    path: &SearchPath,
) -> Result<()> {
    match runner.run(spec, path).await? {
        0 => Ok(()),
        code => Err(BootstrapError::CommandFailed {
            command: spec.display(),
            code,
        }),
    }
}
