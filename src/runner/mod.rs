//! Task resolution and execution engine
//!
//! This module turns a [`Registry`] into a validated [`DependencyGraph`],
//! plans the requested tasks and runs the resulting [`ExecutionPlan`].

pub mod command;
pub mod context;
pub mod executor;
pub mod graph;
pub mod plan;
pub mod task;

// Re-export main types
pub use command::*;
pub use context::*;
pub use executor::*;
pub use graph::*;
pub use plan::*;
pub use task::*;
