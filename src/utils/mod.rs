//! Utils module - Utility functions and helpers

pub mod console;
pub mod logging;
