//! Coloured operator-facing status lines.
//!
//! Progress goes to stdout, warnings and failures to stderr. Colour is
//! disabled automatically by `colored` when `NO_COLOR` is set or the stream is
//! not a terminal.

use colored::Colorize;
use std::time::Duration;

/// A bootstrap step is starting.
pub fn step(message: &str) {
    println!("{} {}", "==>".blue().bold(), message.bold());
}

/// A step finished or was already satisfied.
pub fn success(message: &str) {
    println!("{} {}", "[ok]".green().bold(), message);
}

/// A step was skipped by configuration.
pub fn skipped(message: &str) {
    println!("{} {}", "[skip]".dimmed(), message.dimmed());
}

/// Informational note printed between retry attempts.
pub fn retrying(label: &str, attempt: u32, max_attempts: u32, delay: Duration) {
    eprintln!("{}", retry_line(label, attempt, max_attempts, delay).yellow());
}

/// Fatal error, printed right before the process exits.
pub fn failure(message: &str) {
    eprintln!("{} {}", "[ERR]".red().bold(), message.red());
}

fn retry_line(label: &str, attempt: u32, max_attempts: u32, delay: Duration) -> String {
    format!(
        "{} failed (attempt {}/{}), retrying in {}s...",
        label,
        attempt,
        max_attempts,
        delay.as_secs()
    )
}
