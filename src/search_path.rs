//! Immutable search path used to resolve command names to executables.
//!
//! The bootstrapper never mutates the process-wide `PATH`. Each step receives a
//! [`SearchPath`], may return an extended copy, and exports it only to the
//! children it spawns.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Ordered list of directories consulted when resolving a command name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
}

impl SearchPath {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        let mut path = Self::default();
        for dir in dirs {
            path = path.with_appended(dir);
        }
        path
    }

    /// Parse a `PATH`-style value (`:`-separated on Unix).
    pub fn parse(value: &std::ffi::OsStr) -> Self {
        Self::new(
            std::env::split_paths(value)
                .filter(|p| !p.as_os_str().is_empty())
                .collect(),
        )
    }

    /// Snapshot the current process `PATH`.
    pub fn from_env() -> Self {
        std::env::var_os("PATH")
            .map(|v| Self::parse(&v))
            .unwrap_or_default()
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// Return a copy with `dirs` placed ahead of the existing entries.
    ///
    /// Directories already present are moved to the front rather than duplicated.
    pub fn with_prepended<I, P>(&self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut front: Vec<PathBuf> = Vec::new();
        for dir in dirs {
            let dir = dir.into();
            if !front.contains(&dir) {
                front.push(dir);
            }
        }
        let rest: Vec<PathBuf> = self
            .dirs
            .iter()
            .filter(|d| !front.contains(d))
            .cloned()
            .collect();
        front.extend(rest);
        Self { dirs: front }
    }

    /// Return a copy with `dir` appended, unless it is already present.
    pub fn with_appended(&self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let mut dirs = self.dirs.clone();
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
        Self { dirs }
    }

    /// Resolve `name` to the first executable file found, in order.
    ///
    /// Names containing a path separator are checked directly.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        if name.trim().is_empty() {
            return None;
        }
        if name.contains(std::path::MAIN_SEPARATOR) {
            let candidate = PathBuf::from(name);
            return is_executable(&candidate).then_some(candidate);
        }
        first_existing(self.dirs.iter().map(|dir| dir.join(name)))
    }

    pub fn contains_binary(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Render as a `PATH` value for child processes.
    pub fn to_os_string(&self) -> OsString {
        std::env::join_paths(&self.dirs).unwrap_or_else(|_| {
            // join_paths only fails on entries containing the separator; drop them.
            let usable: Vec<&PathBuf> = self
                .dirs
                .iter()
                .filter(|d| std::env::join_paths([d]).is_ok())
                .collect();
            std::env::join_paths(usable).unwrap_or_default()
        })
    }
}

/// Return the first candidate that exists as an executable file.
pub fn first_existing<I>(candidates: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    candidates.into_iter().find(|c| is_executable(c))
}

#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}
