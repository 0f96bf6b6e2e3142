//! Scripted runner and fetcher for unit tests.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{BootstrapError, Result};
use crate::search_path::SearchPath;

use super::fetcher::ArtifactFetcher;
use super::runner::{CommandRunner, CommandSpec};

enum Effect {
    /// Create an executable file at the path once the command succeeds.
    CreateExe(PathBuf),
    /// Write files relative to the command's last argument (a clone target).
    PopulateTarget(Vec<(String, String)>),
}

struct Rule {
    needle: String,
    /// Remaining failures; `None` fails forever.
    failures_left: Option<u32>,
    code: i32,
    effects: Vec<Effect>,
}

/// Runner whose behaviour is keyed on substrings of the command line or stdin.
///
/// Unmatched commands succeed with no side effects.
pub struct MockRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self {
            rules: Mutex::new(vec![]),
            calls: Mutex::new(vec![]),
        }
    }

    fn rule(self, needle: &str, failures_left: Option<u32>, code: i32, effect: Option<Effect>) -> Self {
        self.rules.lock().unwrap().push(Rule {
            needle: needle.to_string(),
            failures_left,
            code,
            effects: effect.into_iter().collect(),
        });
        self
    }

    /// Fail the first `times` matching invocations with `code`, then succeed.
    pub fn fail_times(self, needle: &str, times: u32, code: i32) -> Self {
        self.rule(needle, Some(times), code, None)
    }

    /// Fail every matching invocation with `code`.
    pub fn always_fail(self, needle: &str, code: i32) -> Self {
        self.rule(needle, None, code, None)
    }

    /// On success, create an executable at `path`.
    pub fn creates(self, needle: &str, path: impl Into<PathBuf>) -> Self {
        self.rule(needle, Some(0), 0, Some(Effect::CreateExe(path.into())))
    }

    /// On success, write `files` under the command's last argument.
    pub fn populates(self, needle: &str, files: &[(&str, &str)]) -> Self {
        let files = files
            .iter()
            .map(|(p, c)| (p.to_string(), c.to_string()))
            .collect();
        self.rule(needle, Some(0), 0, Some(Effect::PopulateTarget(files)))
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn count_matching(&self, needle: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches(c, needle))
            .count()
    }
}

fn matches(spec: &CommandSpec, needle: &str) -> bool {
    spec.display().contains(needle)
        || spec
            .stdin
            .as_ref()
            .is_some_and(|s| String::from_utf8_lossy(s).contains(needle))
}

pub fn write_exe(path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, "#!/bin/sh\n").unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(&self, spec: &CommandSpec, _path: &SearchPath) -> Result<i32> {
        self.calls.lock().unwrap().push(spec.clone());

        let mut rules = self.rules.lock().unwrap();
        let mut code = 0;
        for rule in rules.iter_mut().filter(|r| matches(spec, &r.needle)) {
            match rule.failures_left {
                None => code = rule.code,
                Some(n) if n > 0 => {
                    rule.failures_left = Some(n - 1);
                    code = rule.code;
                }
                Some(_) => {}
            }
        }
        if code != 0 {
            return Ok(code);
        }

        for rule in rules.iter().filter(|r| matches(spec, &r.needle)) {
            for effect in &rule.effects {
                match effect {
                    Effect::CreateExe(path) => write_exe(path),
                    Effect::PopulateTarget(files) => {
                        let target = PathBuf::from(spec.args.last().cloned().unwrap_or_default());
                        for (rel, content) in files {
                            let dest = target.join(rel);
                            std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
                            std::fs::write(dest, content).unwrap();
                        }
                    }
                }
            }
        }
        Ok(0)
    }
}

/// Fetcher returning a fixed body per URL substring and recording requests.
pub struct MockFetcher {
    bodies: Vec<(String, Vec<u8>)>,
    failing: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            bodies: vec![],
            failing: vec![],
            calls: Mutex::new(vec![]),
        }
    }

    pub fn with_body(mut self, needle: &str, body: &[u8]) -> Self {
        self.bodies.push((needle.to_string(), body.to_vec()));
        self
    }

    pub fn failing(mut self, needle: &str) -> Self {
        self.failing.push(needle.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ArtifactFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push(url.to_string());
        if self.failing.iter().any(|n| url.contains(n.as_str())) {
            return Err(BootstrapError::Fetch {
                url: url.to_string(),
                reason: "simulated outage".to_string(),
            });
        }
        Ok(self
            .bodies
            .iter()
            .find(|(n, _)| url.contains(n.as_str()))
            .map(|(_, b)| b.clone())
            // Echo the URL so runner rules can match on it through stdin.
            .unwrap_or_else(|| format!("# installer from {}\n", url).into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_runner_fail_times_then_succeeds() {
        let runner = MockRunner::new().fail_times("foundryup", 2, 9);
        let spec = CommandSpec::new("foundryup");
        let path = SearchPath::default();
        assert_eq!(runner.run(&spec, &path).await.unwrap(), 9);
        assert_eq!(runner.run(&spec, &path).await.unwrap(), 9);
        assert_eq!(runner.run(&spec, &path).await.unwrap(), 0);
        assert_eq!(runner.count_matching("foundryup"), 3);
    }

    #[tokio::test]
    async fn test_mock_runner_matches_stdin() {
        let runner = MockRunner::new().always_fail("foundry.paradigm.xyz", 22);
        let spec = CommandSpec::new("bash").stdin(b"# installer from https://foundry.paradigm.xyz\n".to_vec());
        assert_eq!(runner.run(&spec, &SearchPath::default()).await.unwrap(), 22);
    }

    #[tokio::test]
    async fn test_mock_fetcher_records_calls() {
        let fetcher = MockFetcher::new().failing("down.example");
        assert!(fetcher.fetch("https://up.example/x").await.is_ok());
        assert!(fetcher.fetch("https://down.example/x").await.is_err());
        assert_eq!(fetcher.call_count(), 2);
    }
}
