//! trun - A lightweight YAML-based task runner
//!
//! Tasks are declared in a `trun.yml` file together with the tasks they depend
//! on. trun resolves the dependency graph, rejects unknown references and
//! cycles, and runs every required task exactly once, dependencies first.

// Public modules
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod runner;

// Re-export commonly used types
pub use error::{ErrorKind, Result, TrunError};

/// Current version of trun
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
