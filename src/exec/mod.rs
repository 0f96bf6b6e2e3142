//! Process and network seams.
//!
//! `CommandRunner` launches child processes and `ArtifactFetcher` downloads
//! installer scripts and binaries. Both are traits so every step can be
//! exercised in tests without touching the network or the host toolchain.

pub mod fetcher;
#[cfg(test)]
pub mod mock;
pub mod runner;

pub use fetcher::{ArtifactFetcher, HttpFetcher};
pub use runner::{CommandRunner, CommandSpec, ProcessRunner};
