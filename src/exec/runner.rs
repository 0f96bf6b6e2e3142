//! Child process execution.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{BootstrapError, Result, EXIT_FAILURE};
use crate::search_path::SearchPath;

/// How many trailing stderr lines to log when a captured command fails.
const STDERR_TAIL_LINES: usize = 20;

/// A fully described child process invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Extra environment for the child. `PATH` is always taken from the
    /// search path passed to the runner.
    pub env: Vec<(String, String)>,
    /// Bytes piped to the child's stdin (installer scripts).
    pub stdin: Option<Vec<u8>>,
    /// Inherit the terminal instead of capturing output.
    pub inherit_stdio: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Build from an argv vector. Returns `None` for an empty vector.
    pub fn from_argv<S: AsRef<str>>(argv: &[S]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.as_ref()).args(args.iter().map(|a| a.as_ref().to_string())))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn stdin(mut self, bytes: Vec<u8>) -> Self {
        self.stdin = Some(bytes);
        self
    }

    pub fn inherit_stdio(mut self) -> Self {
        self.inherit_stdio = true;
        self
    }

    /// Human-readable command line, used in logs and errors.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Abstracts process launching for testability.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command to completion and return its exit code.
    ///
    /// A non-zero code is not an error at this layer; only a failure to
    /// start the process is.
    async fn run(&self, spec: &CommandSpec, path: &SearchPath) -> Result<i32>;
}

/// Runner that spawns real child processes with tokio.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec, path: &SearchPath) -> Result<i32> {
        let program = path
            .resolve(&spec.program)
            .unwrap_or_else(|| PathBuf::from(&spec.program));

        let mut cmd = tokio::process::Command::new(&program);
        cmd.args(&spec.args).env("PATH", path.to_os_string());
        for (k, v) in &spec.env {
            cmd.env(k, v);
        }
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }

        cmd.stdin(if spec.stdin.is_some() {
            Stdio::piped()
        } else if spec.inherit_stdio {
            Stdio::inherit()
        } else {
            Stdio::null()
        });
        if spec.inherit_stdio {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }

        debug!(command = %spec.display(), "Spawning process");
        let mut child = cmd.spawn().map_err(|e| BootstrapError::Spawn {
            program: spec.program.clone(),
            source: e,
        })?;

        // Feed stdin from a separate task so a chatty child cannot fill its
        // stdout pipe while we are still writing the script.
        let writer = match (spec.stdin.clone(), child.stdin.take()) {
            (Some(bytes), Some(mut stdin)) => Some(tokio::spawn(async move {
                stdin.write_all(&bytes).await?;
                stdin.shutdown().await
            })),
            _ => None,
        };

        let output = child.wait_with_output().await?;
        if let Some(writer) = writer {
            match writer.await {
                Ok(Err(e)) if e.kind() != std::io::ErrorKind::BrokenPipe => {
                    debug!(command = %spec.display(), error = %e, "Failed writing stdin")
                }
                _ => {}
            }
        }
        let code = exit_code(&output.status);

        if code != 0 && !spec.inherit_stdio {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<&str> = stderr.lines().collect();
            let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
            warn!(command = %spec.display(), code, stderr = %tail, "Command failed");
        }

        Ok(code)
    }
}

/// Map an exit status to a shell-style code (128 + signal when killed).
fn exit_code(status: &std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    EXIT_FAILURE
}
